//! 候选注册表
//!
//! 保存按发现顺序排列的候选声明。顺序有语义：同一阶段内，
//! 后声明的候选可以依赖先声明的候选已经激活。

use std::collections::HashMap;
use std::sync::Arc;

use crate::candidate::{Candidate, Phase};
use crate::error::{ConditionError, ConditionResult};
use crate::ordering;

/// 候选注册表
#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Arc<Candidate>>,
    index: HashMap<String, usize>,
}

impl CandidateRegistry {
    /// 创建新的候选注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按给定顺序注册一组候选
    pub fn from_candidates(
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> ConditionResult<Self> {
        let mut registry = Self::new();
        for candidate in candidates {
            registry.register(candidate)?;
        }
        Ok(registry)
    }

    /// 注册候选
    ///
    /// 注册后候选不可变；重复的标识视为声明错误
    pub fn register(&mut self, candidate: Candidate) -> ConditionResult<()> {
        if self.index.contains_key(candidate.id()) {
            tracing::warn!("Candidate '{}' already registered", candidate.id());
            return Err(ConditionError::DuplicateCandidate(candidate.id().to_string()));
        }

        tracing::debug!(
            "Registering candidate '{}' (phase: {}, conditions: {})",
            candidate.id(),
            candidate.phase(),
            candidate.conditions().len()
        );
        self.index
            .insert(candidate.id().to_string(), self.candidates.len());
        self.candidates.push(Arc::new(candidate));
        Ok(())
    }

    /// 指定阶段的候选，保持注册顺序
    pub fn candidates_for_phase(&self, phase: Phase) -> impl Iterator<Item = &Arc<Candidate>> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.phase() == phase)
    }

    /// 所有候选，保持注册顺序
    pub fn candidates(&self) -> &[Arc<Candidate>] {
        &self.candidates
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Candidate>> {
        self.index.get(id).map(|&i| &self.candidates[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// 按 after/before 排序提示重新排列候选
    ///
    /// 未受约束的候选保持发现顺序；提示成环时返回错误
    pub fn apply_ordering_hints(&mut self) -> ConditionResult<()> {
        let order = {
            let refs: Vec<&Candidate> = self.candidates.iter().map(|c| c.as_ref()).collect();
            ordering::hinted_order(&refs)?
        };

        let reordered: Vec<Arc<Candidate>> = order
            .into_iter()
            .map(|i| Arc::clone(&self.candidates[i]))
            .collect();
        self.index = reordered
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().to_string(), i))
            .collect();
        self.candidates = reordered;
        Ok(())
    }
}

/// 用于全局收集候选声明的宏
///
/// ```ignore
/// chimera_autoconfigure::submit_candidate!(10, || {
///     Candidate::for_type("JmsTemplate")
///         .with_condition(Condition::class_present("JmsTemplate"))
/// });
/// ```
#[macro_export]
macro_rules! submit_candidate {
    ($order:expr, $factory:expr) => {
        $crate::inventory::submit! {
            $crate::CandidateSubmission {
                order: $order,
                create: $factory,
            }
        }
    };
    ($factory:expr) => {
        $crate::submit_candidate!(0, $factory);
    };
}

/// 候选提交结构
pub struct CandidateSubmission {
    /// 发现顺序（数字越小越先处理，相同时保持收集顺序）
    pub order: i32,
    pub create: fn() -> Candidate,
}

inventory::collect!(CandidateSubmission);

/// 从全局注册表加载所有候选
pub fn load_candidates() -> ConditionResult<CandidateRegistry> {
    let mut submissions: Vec<&CandidateSubmission> =
        inventory::iter::<CandidateSubmission>.into_iter().collect();
    submissions.sort_by_key(|submission| submission.order);

    let mut registry = CandidateRegistry::new();
    for submission in submissions {
        registry.register((submission.create)())?;
    }
    registry.apply_ordering_hints()?;

    tracing::info!("Loaded {} candidate(s) from declarations", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::submit_candidate!(-100, || Candidate::new("inventoryFirst"));
    crate::submit_candidate!(|| Candidate::new("inventoryLater").with_after("inventoryFirst"));

    #[test]
    fn test_duplicate_candidate_rejected() {
        let mut registry = CandidateRegistry::new();
        registry.register(Candidate::new("jmsTemplate")).unwrap();

        let err = registry.register(Candidate::new("jmsTemplate")).unwrap_err();
        assert!(matches!(err, ConditionError::DuplicateCandidate(ref id) if id == "jmsTemplate"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_candidates_for_phase_preserves_registration_order() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("zeta"),
            Candidate::new("packages").with_phase(Phase::ParseConfiguration),
            Candidate::new("alpha"),
        ])
        .unwrap();

        let register: Vec<&str> = registry
            .candidates_for_phase(Phase::RegisterBean)
            .map(|c| c.id())
            .collect();
        assert_eq!(register, vec!["zeta", "alpha"]);

        let parse: Vec<&str> = registry
            .candidates_for_phase(Phase::ParseConfiguration)
            .map(|c| c.id())
            .collect();
        assert_eq!(parse, vec!["packages"]);
    }

    #[test]
    fn test_apply_ordering_hints_updates_lookup_index() {
        let mut registry = CandidateRegistry::from_candidates([
            Candidate::new("b").with_after("a"),
            Candidate::new("a"),
        ])
        .unwrap();

        registry.apply_ordering_hints().unwrap();

        let ids: Vec<&str> = registry.candidates().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.get("b").map(|c| c.id()), Some("b"));
    }

    #[test]
    fn test_load_candidates_from_inventory() {
        let registry = load_candidates().unwrap();
        let ids: Vec<&str> = registry.candidates().iter().map(|c| c.id()).collect();

        let first = ids.iter().position(|id| *id == "inventoryFirst").unwrap();
        let later = ids.iter().position(|id| *id == "inventoryLater").unwrap();
        assert!(first < later);
    }
}
