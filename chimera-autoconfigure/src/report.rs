//! 条件评估报告
//!
//! 把解析追踪格式化为可读文本，不包含任何决策逻辑。
//! 被跳过的候选按导致跳过的条件种类分组。

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::condition::ConditionKind;
use crate::trace::{ResolutionTrace, TraceEntry};

/// 报告详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// 每个候选只显示结论
    #[default]
    Summary,

    /// 显示每个已评估条件的结果
    Debug,
}

const HEADER: &str = "CONDITION EVALUATION REPORT";

/// 渲染文本报告
pub fn render(trace: &ResolutionTrace, mode: ReportMode) -> String {
    let mut positive = Vec::new();
    let mut negative: BTreeMap<ConditionKind, Vec<&TraceEntry>> = BTreeMap::new();
    let mut exclusions = Vec::new();
    let mut unconditional = Vec::new();

    for entry in trace.entries() {
        if entry.excluded {
            exclusions.push(entry);
        } else if entry.is_unconditional() {
            unconditional.push(entry);
        } else if entry.outcome.is_activated() {
            positive.push(entry);
        } else if let Some(failing) = entry.failing_record() {
            negative.entry(failing.kind.clone()).or_default().push(entry);
        }
    }

    let mut out = String::new();
    let rule = "=".repeat(HEADER.len());
    let _ = writeln!(out, "\n{}\n{}\n{}\n", rule, HEADER, rule);

    section(&mut out, "Positive matches");
    if positive.is_empty() {
        let _ = writeln!(out, "   None");
    }
    for entry in &positive {
        let _ = writeln!(out, "   {} ({}) matched", entry.candidate, entry.phase);
        if mode == ReportMode::Debug {
            for record in &entry.records {
                let _ = writeln!(out, "      - {} {}", record.kind, record.message);
            }
        }
    }

    section(&mut out, "Negative matches");
    if negative.is_empty() {
        let _ = writeln!(out, "   None");
    }
    for (kind, entries) in &negative {
        let _ = writeln!(out, "   {}:", kind);
        for entry in entries {
            let _ = writeln!(out, "      {} ({}):", entry.candidate, entry.phase);
            for record in &entry.records {
                if record.matched && mode == ReportMode::Summary {
                    continue;
                }
                let verdict = if record.matched { "Matched" } else { "Did not match" };
                let _ = writeln!(out, "         - {}: {}", verdict, record.message);
            }
        }
    }

    section(&mut out, "Exclusions");
    list(&mut out, &exclusions);

    section(&mut out, "Unconditional candidates");
    list(&mut out, &unconditional);

    out
}

/// 渲染 JSON 报告
pub fn render_json(trace: &ResolutionTrace) -> serde_json::Result<String> {
    serde_json::to_string_pretty(trace)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}:\n{}\n", title, "-".repeat(title.len() + 1));
}

fn list(out: &mut String, entries: &[&TraceEntry]) {
    if entries.is_empty() {
        let _ = writeln!(out, "   None");
    }
    for entry in entries {
        let _ = writeln!(out, "   {}", entry.candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Outcome;
    use crate::candidate::Phase;
    use crate::trace::ConditionRecord;

    fn record(kind: ConditionKind, matched: bool, message: &str) -> ConditionRecord {
        ConditionRecord {
            kind,
            description: String::new(),
            matched,
            message: message.to_string(),
        }
    }

    fn sample_trace() -> ResolutionTrace {
        let mut trace = ResolutionTrace::new();
        trace.push(TraceEntry {
            candidate: "autoConfigurationPackages".to_string(),
            phase: Phase::ParseConfiguration,
            records: Vec::new(),
            outcome: Outcome::Activated,
            excluded: false,
        });
        trace.push(TraceEntry {
            candidate: "jmsTemplate".to_string(),
            phase: Phase::RegisterBean,
            records: vec![
                record(ConditionKind::OnClass, true, "required class 'JmsTemplate' found"),
                record(
                    ConditionKind::OnClass,
                    false,
                    "required class 'ConnectionFactory' not found",
                ),
            ],
            outcome: Outcome::Skipped {
                reason: "OnClass required class 'ConnectionFactory' not found".to_string(),
            },
            excluded: false,
        });
        trace.push(TraceEntry {
            candidate: "transactionManager".to_string(),
            phase: Phase::RegisterBean,
            records: vec![record(ConditionKind::OnJndi, true, "found JNDI location 'java:/TransactionManager'")],
            outcome: Outcome::Activated,
            excluded: false,
        });
        trace.push(TraceEntry {
            candidate: "repositoryRestMvc".to_string(),
            phase: Phase::RegisterBean,
            records: Vec::new(),
            outcome: Outcome::Skipped {
                reason: "excluded".to_string(),
            },
            excluded: true,
        });
        trace
    }

    #[test]
    fn test_summary_report_sections() {
        let report = render(&sample_trace(), ReportMode::Summary);

        assert!(report.contains(HEADER));
        let positive = report.find("Positive matches").unwrap();
        let negative = report.find("Negative matches").unwrap();
        let exclusions = report.find("Exclusions").unwrap();
        let unconditional = report.find("Unconditional candidates").unwrap();
        assert!(positive < negative && negative < exclusions && exclusions < unconditional);

        assert!(report.contains("transactionManager (REGISTER_BEAN) matched"));
        assert!(report.contains("   OnClass:\n      jmsTemplate (REGISTER_BEAN):"));
        assert!(report.contains("Did not match: required class 'ConnectionFactory' not found"));
        assert!(!report.contains("required class 'JmsTemplate' found"));
        assert!(report[exclusions..unconditional].contains("repositoryRestMvc"));
        assert!(report[unconditional..].contains("autoConfigurationPackages"));
    }

    #[test]
    fn test_debug_report_lists_every_condition() {
        let report = render(&sample_trace(), ReportMode::Debug);

        assert!(report.contains("- OnJndi found JNDI location 'java:/TransactionManager'"));
        assert!(report.contains("Matched: required class 'JmsTemplate' found"));
    }

    #[test]
    fn test_empty_trace_report() {
        let report = render(&ResolutionTrace::new(), ReportMode::Summary);
        assert_eq!(report.matches("   None").count(), 4);
    }

    #[test]
    fn test_json_report() {
        let json = render_json(&sample_trace()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let entries = value["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1]["candidate"], "jmsTemplate");
        assert_eq!(entries[1]["phase"], "register-bean");
        assert_eq!(entries[1]["outcome"]["status"], "SKIPPED");
        assert_eq!(entries[1]["records"][1]["kind"], "on-class");
        assert_eq!(entries[3]["excluded"], true);
    }
}
