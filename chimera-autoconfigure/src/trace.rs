use serde::Serialize;

use crate::activation::Outcome;
use crate::candidate::Phase;
use crate::condition::ConditionKind;

/// 单个条件的评估记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionRecord {
    pub kind: ConditionKind,
    pub description: String,
    pub matched: bool,
    pub message: String,
}

/// 单个候选的评估记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub candidate: String,
    pub phase: Phase,
    /// 实际评估过的条件（短路后未评估的条件不出现）
    pub records: Vec<ConditionRecord>,
    pub outcome: Outcome,
    /// 是否因配置排除而未评估
    pub excluded: bool,
}

impl TraceEntry {
    /// 导致跳过的条件
    pub fn failing_record(&self) -> Option<&ConditionRecord> {
        self.records.iter().find(|record| !record.matched)
    }

    pub fn is_unconditional(&self) -> bool {
        !self.excluded && self.records.is_empty()
    }
}

/// 解析追踪 - 按处理顺序排列的评估记录
///
/// 由解析器在运行中生成，之后只读
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTrace {
    entries: Vec<TraceEntry>,
}

impl ResolutionTrace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn entry(&self, candidate: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|entry| entry.candidate == candidate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
