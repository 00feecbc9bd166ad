use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    lint::{LintContext, LintRule},
    model::Diagnostic,
    syntax::location,
    trigger::{CRON_EVENT, CRON_SCHEDULE_FIELD, extract_trigger},
};

lazy_static! {
    static ref CRON_FIELD_RE: Regex = Regex::new(r"^(\*|[0-9A-Za-z]+(-[0-9A-Za-z]+)?)(/[0-9]+)?(,(\*|[0-9A-Za-z]+(-[0-9A-Za-z]+)?)(/[0-9]+)?)*$").unwrap();
}

/// Scheduled flows need a five-field cron expression.
#[derive(Clone, Debug, Default)]
pub struct CronScheduleRule;

impl LintRule for CronScheduleRule {
    fn name(&self) -> &'static str {
        "cron-schedule"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let Some(class) = ctx.ir.flow_class() else {
            return Vec::new();
        };
        let trigger = extract_trigger(ctx.ir).unwrap_or_default();
        let anchor = class
            .field(CRON_SCHEDULE_FIELD)
            .map(|f| f.node)
            .unwrap_or(class.node);

        let Some(schedule) = trigger.cron_schedule else {
            if trigger.event_type.as_deref() == Some(CRON_EVENT) {
                return vec![
                    Diagnostic::new(
                        self.name(),
                        format!(
                            "Flows triggered by '{CRON_EVENT}' must declare a {CRON_SCHEDULE_FIELD} field."
                        ),
                    )
                    .at(location(anchor)),
                ];
            }
            return Vec::new();
        };

        let fields: Vec<&str> = schedule.split_whitespace().collect();
        if fields.len() != 5 {
            return vec![
                Diagnostic::new(
                    self.name(),
                    format!(
                        "Cron schedule '{schedule}' must have 5 fields (minute hour day-of-month month day-of-week), found {}.",
                        fields.len()
                    ),
                )
                .at(location(anchor)),
            ];
        }
        fields
            .iter()
            .filter(|field| !CRON_FIELD_RE.is_match(field))
            .map(|field| {
                Diagnostic::new(
                    self.name(),
                    format!("Cron schedule '{schedule}' has an invalid field '{field}'."),
                )
                .at(location(anchor))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AnalyzerConfig, lint::test_support::run_rule};

    fn flow(schedule: &str) -> String {
        format!(
            "class Daily extends BubbleFlow<'schedule/cron'> {{\n  readonly cronSchedule = '{schedule}';\n  async handle(payload: CronEvent) {{}}\n}}\n"
        )
    }

    #[test]
    fn accepts_standard_expressions() {
        for schedule in ["0 9 * * 1-5", "*/15 * * * *", "0 0 1,15 JAN-JUN MON"] {
            assert!(
                run_rule(&CronScheduleRule, &flow(schedule), &AnalyzerConfig::default()).is_empty(),
                "{schedule}"
            );
        }
    }

    #[test]
    fn rejects_wrong_field_count_and_garbage() {
        let errors = run_rule(&CronScheduleRule, &flow("0 9 * *"), &AnalyzerConfig::default());
        assert_eq!(
            errors,
            ["Cron schedule '0 9 * *' must have 5 fields (minute hour day-of-month month day-of-week), found 4."]
        );
        let errors = run_rule(&CronScheduleRule, &flow("0 9 * * m@n"), &AnalyzerConfig::default());
        assert_eq!(errors, ["Cron schedule '0 9 * * m@n' has an invalid field 'm@n'."]);
    }

    #[test]
    fn cron_trigger_requires_schedule() {
        let source = "class Daily extends BubbleFlow<'schedule/cron'> {\n  async handle(payload: CronEvent) {}\n}\n";
        let errors = run_rule(&CronScheduleRule, source, &AnalyzerConfig::default());
        assert_eq!(
            errors,
            ["Flows triggered by 'schedule/cron' must declare a cronSchedule field."]
        );
    }
}
