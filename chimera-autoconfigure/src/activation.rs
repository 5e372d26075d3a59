use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// 候选的最终结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Activated,
    Skipped { reason: String },
}

impl Outcome {
    pub fn is_activated(&self) -> bool {
        matches!(self, Outcome::Activated)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Activated => None,
            Outcome::Skipped { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Activated => write!(f, "ACTIVATED"),
            Outcome::Skipped { reason } => write!(f, "SKIPPED({})", reason),
        }
    }
}

/// 候选在一次解析中的状态
///
/// PENDING -> EVALUATING -> {ACTIVATED | SKIPPED}，终态不再转换
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
    Pending,
    Evaluating,
    Done(Outcome),
}

impl CandidateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CandidateState::Done(_))
    }

    /// 是否允许转换到下一个状态
    pub fn can_transition_to(&self, next: &CandidateState) -> bool {
        matches!(
            (self, next),
            (CandidateState::Pending, CandidateState::Evaluating)
                | (CandidateState::Evaluating, CandidateState::Done(_))
        )
    }
}

/// 激活集合 - 解析的输出
///
/// 按处理顺序单调追加，不会撤回
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationSet {
    entries: Vec<(String, Outcome)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ActivationSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 记录候选结果；已记录的候选保持原结果
    pub(crate) fn record(&mut self, candidate: &str, outcome: Outcome) {
        if self.index.contains_key(candidate) {
            tracing::warn!(
                "Candidate '{}' already has an outcome, ignoring {}",
                candidate,
                outcome
            );
            return;
        }
        self.index.insert(candidate.to_string(), self.entries.len());
        self.entries.push((candidate.to_string(), outcome));
    }

    pub fn get(&self, candidate: &str) -> Option<&Outcome> {
        self.index.get(candidate).map(|&i| &self.entries[i].1)
    }

    pub fn is_activated(&self, candidate: &str) -> bool {
        self.get(candidate).is_some_and(Outcome::is_activated)
    }

    /// 按处理顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.entries.iter().map(|(id, outcome)| (id.as_str(), outcome))
    }

    /// 已激活的候选（按处理顺序）
    pub fn activated(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, outcome)| outcome.is_activated())
            .map(|(id, _)| id)
            .collect()
    }

    /// 被跳过的候选及原因（按处理顺序）
    pub fn skipped(&self) -> Vec<(&str, &str)> {
        self.iter()
            .filter_map(|(id, outcome)| outcome.reason().map(|reason| (id, reason)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
