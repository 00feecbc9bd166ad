//! Built-in trigger payload types and trigger metadata extraction.

use crate::{
    ir::FlowIr,
    model::TriggerInfo,
    syntax::{named_children, string_value, unwrap_expression},
};

pub const CRON_SCHEDULE_FIELD: &str = "cronSchedule";
pub const CRON_EVENT: &str = "schedule/cron";

/// Payload shapes every flow can reference without declaring them, written as TypeScript so
/// they resolve through the same structural machinery as user declarations.
pub const BUILTIN_TRIGGER_EVENTS: &str = r#"
interface BubbleTriggerEvent {
  type: string;
  timestamp: string;
  executionId: string;
  path: string;
  body?: Record<string, unknown>;
}

interface WebhookEvent extends BubbleTriggerEvent {
  method?: string;
  headers?: Record<string, string>;
  query?: Record<string, string>;
}

interface CronEvent extends BubbleTriggerEvent {
  cron: string;
  body?: Record<string, unknown>;
}

interface SlackEventBase extends BubbleTriggerEvent {
  slack_event: Record<string, unknown>;
  channel: string;
  user: string;
  text: string;
  thread_ts?: string;
}

interface SlackMentionEvent extends SlackEventBase {
  bot_id?: string;
}

interface SlackMessageReceivedEvent extends SlackEventBase {
  channel_type?: string;
}

interface GmailEmailReceivedEvent extends BubbleTriggerEvent {
  from: string;
  to: string;
  subject: string;
  snippet: string;
  messageId: string;
}
"#;

/// Trigger type argument and cron schedule of the flow class, when declared.
pub fn extract_trigger(ir: &FlowIr<'_>) -> Option<TriggerInfo> {
    let class = ir.flow_class()?;
    let src = ir.src();
    let event_type = class.type_arguments.and_then(|args| {
        let first = named_children(args).into_iter().next()?;
        let literal = match first.kind() {
            "literal_type" => named_children(first).into_iter().next()?,
            _ => first,
        };
        string_value(literal, src)
    });
    let cron_schedule = class
        .field(CRON_SCHEDULE_FIELD)
        .and_then(|f| f.value)
        .and_then(|v| string_value(unwrap_expression(v), src));

    if event_type.is_none() && cron_schedule.is_none() {
        return None;
    }
    Some(TriggerInfo {
        event_type,
        cron_schedule,
    })
}
