//! 解析器 - 条件装配的状态机
//!
//! 按阶段顺序、阶段内按注册顺序单遍处理候选。每个候选的条件针对
//! *当前* Fact Store 评估，激活后立即记录，后续候选可以看到。
//! 没有回溯：先被跳过的候选不会因为后来的激活而重新评估。

use std::sync::Arc;

use crate::activation::{ActivationSet, CandidateState, Outcome};
use crate::candidate::{Candidate, Phase};
use crate::condition::ConditionContext;
use crate::config::ResolverSettings;
use crate::constants;
use crate::error::ConditionResult;
use crate::fact::FactStore;
use crate::listener::{ResolutionEvent, ResolutionListener};
use crate::registry::CandidateRegistry;
use crate::report::{self, ReportMode};
use crate::trace::{ConditionRecord, ResolutionTrace, TraceEntry};

/// 一次解析的结果
#[derive(Debug, Clone)]
pub struct Resolution {
    activations: ActivationSet,
    trace: ResolutionTrace,
    facts: Arc<FactStore>,
}

impl Resolution {
    pub fn activations(&self) -> &ActivationSet {
        &self.activations
    }

    pub fn trace(&self) -> &ResolutionTrace {
        &self.trace
    }

    /// 解析结束时冻结的 Fact Store，可作为子上下文的父 Fact Store
    pub fn facts(&self) -> &Arc<FactStore> {
        &self.facts
    }

    pub fn is_activated(&self, candidate: &str) -> bool {
        self.activations.is_activated(candidate)
    }

    /// 生成条件评估报告
    pub fn report(&self, mode: ReportMode) -> String {
        report::render(&self.trace, mode)
    }

    pub fn into_parts(self) -> (ActivationSet, ResolutionTrace, Arc<FactStore>) {
        (self.activations, self.trace, self.facts)
    }
}

/// 解析器
///
/// 一个解析器实例独占一个 Fact Store，`resolve` 消耗解析器本身，
/// 因此同一个 Fact Store 不会被两次运行共享。
pub struct Resolver {
    facts: FactStore,
    settings: ResolverSettings,
    listeners: Vec<Arc<dyn ResolutionListener>>,
}

impl Resolver {
    pub fn new(facts: FactStore) -> Self {
        Self {
            facts,
            settings: ResolverSettings::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 添加解析监听器
    pub fn with_listener(mut self, listener: Arc<dyn ResolutionListener>) -> Self {
        tracing::debug!("Added resolution listener: {}", listener.listener_name());
        self.listeners.push(listener);
        self
    }

    /// 执行解析
    ///
    /// 配置错误会中止整个解析，不返回部分激活集合
    pub fn resolve(self, registry: &CandidateRegistry) -> ConditionResult<Resolution> {
        let Resolver {
            mut facts,
            settings,
            listeners,
        } = self;

        tracing::info!(
            "Resolving {} candidate(s) ({} excluded by configuration)",
            registry.len(),
            settings.exclude.len()
        );
        publish(
            &listeners,
            ResolutionEvent::RunStarted {
                candidates: registry.len(),
            },
        );

        let mut activations = ActivationSet::new();
        let mut trace = ResolutionTrace::new();

        for phase in Phase::ALL {
            let candidates: Vec<&Arc<Candidate>> = registry.candidates_for_phase(phase).collect();
            tracing::debug!("Phase {}: {} candidate(s)", phase, candidates.len());
            publish(
                &listeners,
                ResolutionEvent::PhaseStarted {
                    phase,
                    candidates: candidates.len(),
                },
            );

            for candidate in candidates {
                let entry = process_candidate(&mut facts, &settings, candidate, phase)?;

                match &entry.outcome {
                    Outcome::Activated => {
                        tracing::debug!("Candidate '{}' ACTIVATED", entry.candidate);
                        publish(
                            &listeners,
                            ResolutionEvent::CandidateActivated {
                                candidate: &entry.candidate,
                                phase,
                            },
                        );
                    }
                    Outcome::Skipped { reason } => {
                        tracing::debug!("Candidate '{}' SKIPPED: {}", entry.candidate, reason);
                        publish(
                            &listeners,
                            ResolutionEvent::CandidateSkipped {
                                candidate: &entry.candidate,
                                phase,
                                reason,
                            },
                        );
                    }
                }

                activations.record(&entry.candidate, entry.outcome.clone());
                trace.push(entry);
            }
        }

        let activated = activations.activated().len();
        let skipped = activations.len() - activated;
        tracing::info!(
            "Resolution completed: {} activated, {} skipped",
            activated,
            skipped
        );
        publish(&listeners, ResolutionEvent::RunCompleted { activated, skipped });

        Ok(Resolution {
            activations,
            trace,
            facts: facts.freeze(),
        })
    }
}

/// 处理单个候选：PENDING -> EVALUATING -> {ACTIVATED | SKIPPED}
fn process_candidate(
    facts: &mut FactStore,
    settings: &ResolverSettings,
    candidate: &Candidate,
    phase: Phase,
) -> ConditionResult<TraceEntry> {
    let mut state = CandidateState::Pending;
    transition(&mut state, CandidateState::Evaluating, candidate.id());

    let (outcome, records, excluded) = if settings.is_excluded(candidate.id()) {
        let reason = format!("excluded by '{}'", constants::EXCLUDE_PROPERTY);
        (Outcome::Skipped { reason }, Vec::new(), true)
    } else {
        let (outcome, records) = evaluate_conditions(facts, candidate, phase).map_err(|err| {
            tracing::error!("Resolution aborted at candidate '{}': {}", candidate.id(), err);
            err
        })?;
        (outcome, records, false)
    };

    if outcome.is_activated() {
        facts.record_activation(candidate);
    }
    transition(&mut state, CandidateState::Done(outcome.clone()), candidate.id());

    Ok(TraceEntry {
        candidate: candidate.id().to_string(),
        phase,
        records,
        outcome,
        excluded,
    })
}

/// AND 组合并短路：第一个不匹配的条件给出跳过原因
fn evaluate_conditions(
    facts: &FactStore,
    candidate: &Candidate,
    phase: Phase,
) -> ConditionResult<(Outcome, Vec<ConditionRecord>)> {
    let context = ConditionContext::new(facts, candidate, phase);
    let mut records = Vec::with_capacity(candidate.conditions().len());

    for condition in candidate.conditions() {
        let result = condition.evaluate(&context)?;
        let matched = result.matched;
        records.push(ConditionRecord {
            kind: condition.kind(),
            description: condition.describe(),
            matched,
            message: result.message,
        });

        if !matched {
            let reason = records
                .last()
                .map(|record| format!("{} {}", record.kind, record.message))
                .unwrap_or_default();
            return Ok((Outcome::Skipped { reason }, records));
        }
    }

    Ok((Outcome::Activated, records))
}

fn transition(state: &mut CandidateState, next: CandidateState, candidate: &str) {
    debug_assert!(
        state.can_transition_to(&next),
        "illegal transition {:?} -> {:?} for '{}'",
        state,
        next,
        candidate
    );
    tracing::trace!("Candidate '{}': {:?} -> {:?}", candidate, state, next);
    *state = next;
}

fn publish(listeners: &[Arc<dyn ResolutionListener>], event: ResolutionEvent<'_>) {
    for listener in listeners {
        tracing::trace!(
            "Publishing {} to {}",
            event.event_name(),
            listener.listener_name()
        );
        listener.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SearchScope;
    use crate::condition::{BeanSearch, Condition, PropertyCondition};
    use crate::config::Environment;
    use crate::error::ConditionError;
    use parking_lot::Mutex;

    fn resolve(facts: FactStore, candidates: Vec<Candidate>) -> Resolution {
        let registry = CandidateRegistry::from_candidates(candidates).unwrap();
        Resolver::new(facts).resolve(&registry).unwrap()
    }

    fn jms_template() -> Candidate {
        Candidate::new("jmsTemplate")
            .with_condition(Condition::class_present("JmsTemplate"))
            .with_condition(Condition::class_present("ConnectionFactory"))
    }

    #[test]
    fn test_unconditional_candidates_always_activate() {
        let empty = resolve(FactStore::builder().build(), vec![Candidate::new("plain")]);
        let busy = resolve(
            FactStore::builder()
                .classes(["A", "B"])
                .property("debug", "true")
                .bean("plain2", ["Plain"])
                .build(),
            vec![Candidate::new("plain")],
        );

        assert!(empty.is_activated("plain"));
        assert!(busy.is_activated("plain"));
        assert!(empty.trace().entry("plain").unwrap().is_unconditional());
    }

    #[test]
    fn test_jms_template_activates_when_classes_present() {
        let resolution = resolve(
            FactStore::builder()
                .classes(["JmsTemplate", "ConnectionFactory"])
                .build(),
            vec![jms_template()],
        );

        assert_eq!(resolution.activations().len(), 1);
        assert_eq!(
            resolution.activations().get("jmsTemplate"),
            Some(&Outcome::Activated)
        );
        assert_eq!(resolution.trace().entry("jmsTemplate").unwrap().records.len(), 2);
    }

    #[test]
    fn test_jms_template_skipped_names_missing_class() {
        let resolution = resolve(
            FactStore::builder().classes(["JmsTemplate"]).build(),
            vec![jms_template()],
        );

        let outcome = resolution.activations().get("jmsTemplate").unwrap();
        assert!(!outcome.is_activated());
        assert!(outcome.reason().unwrap().contains("ConnectionFactory"));

        let entry = resolution.trace().entry("jmsTemplate").unwrap();
        assert_eq!(entry.failing_record().unwrap().description, "ConnectionFactory");
    }

    #[test]
    fn test_short_circuit_reports_first_failure_only() {
        let resolution = resolve(
            FactStore::builder().build(),
            vec![jms_template()],
        );

        let entry = resolution.trace().entry("jmsTemplate").unwrap();
        assert_eq!(entry.records.len(), 1);
        assert!(entry.outcome.reason().unwrap().contains("JmsTemplate"));
        assert!(!entry.outcome.reason().unwrap().contains("ConnectionFactory"));
    }

    #[test]
    fn test_order_sensitivity() {
        let a = || Candidate::new("x");
        let b = || Candidate::new("b").with_condition(Condition::bean_absent(BeanSearch::named("x")));

        let a_first = resolve(FactStore::builder().build(), vec![a(), b()]);
        assert!(a_first.is_activated("x"));
        assert!(!a_first.is_activated("b"));

        let b_first = resolve(FactStore::builder().build(), vec![b(), a()]);
        assert!(b_first.is_activated("b"));
        assert!(b_first.is_activated("x"));
    }

    #[test]
    fn test_bean_absent_is_monotonic_over_assignable_types() {
        let facts = FactStore::builder()
            .supertypes("JmsTemplate", ["JmsOperations"])
            .build();
        let absent_ops = |id: &str| {
            Candidate::new(id).with_condition(Condition::bean_absent(BeanSearch::of_type("JmsOperations")))
        };

        let resolution = resolve(
            facts,
            vec![
                absent_ops("early"),
                Candidate::factory("jmsTemplate", "JmsTemplate"),
                absent_ops("late"),
                absent_ops("later"),
            ],
        );

        assert!(resolution.is_activated("early"));
        assert!(resolution.is_activated("jmsTemplate"));
        assert!(!resolution.is_activated("late"));
        assert!(!resolution.is_activated("later"));
    }

    #[test]
    fn test_bean_absent_blocked_by_initial_registration() {
        let facts = FactStore::builder()
            .supertypes("CachingConnectionFactory", ["ConnectionFactory"])
            .bean("userConnectionFactory", ["CachingConnectionFactory"])
            .build();

        let resolution = resolve(
            facts,
            vec![Candidate::factory("jmsConnectionFactory", "ConnectionFactory")
                .with_condition(Condition::bean_absent(BeanSearch::deduced()))],
        );

        let reason = resolution
            .activations()
            .get("jmsConnectionFactory")
            .and_then(Outcome::reason)
            .unwrap();
        assert!(reason.contains("userConnectionFactory"));
    }

    #[test]
    fn test_no_backtracking_after_later_activation() {
        let resolution = resolve(
            FactStore::builder().build(),
            vec![
                Candidate::new("needsX").with_condition(Condition::bean_present(BeanSearch::named("x"))),
                Candidate::new("x"),
            ],
        );

        assert!(!resolution.is_activated("needsX"));
        assert!(resolution.is_activated("x"));
        assert_eq!(resolution.trace().len(), 2);
    }

    #[test]
    fn test_parse_configuration_runs_before_register_bean() {
        let resolution = resolve(
            FactStore::builder().build(),
            vec![
                Candidate::new("componentScan").with_condition(Condition::bean_present(
                    BeanSearch::named(constants::AUTO_CONFIGURATION_PACKAGES_BEAN_NAME),
                )),
                Candidate::new(constants::AUTO_CONFIGURATION_PACKAGES_BEAN_NAME)
                    .with_phase(Phase::ParseConfiguration),
            ],
        );

        assert!(resolution.is_activated("componentScan"));
        let order: Vec<&str> = resolution.activations().iter().map(|(id, _)| id).collect();
        assert_eq!(
            order,
            vec![constants::AUTO_CONFIGURATION_PACKAGES_BEAN_NAME, "componentScan"]
        );
    }

    #[test]
    fn test_property_match_if_missing() {
        let resolution = resolve(
            FactStore::builder().build(),
            vec![
                Candidate::new("lenient")
                    .with_condition(Condition::property(PropertyCondition::new("spring.jms.enabled"))),
                Candidate::new("strict").with_condition(Condition::property(
                    PropertyCondition::new("spring.jms.enabled").match_if_missing(false),
                )),
            ],
        );

        assert!(resolution.is_activated("lenient"));
        assert!(!resolution.is_activated("strict"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let facts = || {
            FactStore::builder()
                .classes(["JmsTemplate"])
                .bean("existing", ["Existing"])
                .supertypes("JmsTemplate", ["JmsOperations"])
                .build()
        };
        let candidates = || {
            vec![
                jms_template(),
                Candidate::factory("ops", "JmsOperations")
                    .with_condition(Condition::bean_absent(BeanSearch::deduced())),
                Candidate::new("existingUser")
                    .with_condition(Condition::bean_present(BeanSearch::of_type("Existing"))),
            ]
        };

        let first = resolve(facts(), candidates());
        let second = resolve(facts(), candidates());

        assert_eq!(first.activations(), second.activations());
        assert_eq!(first.trace(), second.trace());
    }

    #[test]
    fn test_configuration_error_aborts_run() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("fine"),
            Candidate::new("jmsConfiguration")
                .with_condition(Condition::bean_absent(BeanSearch::deduced())),
            Candidate::new("neverReached"),
        ])
        .unwrap();

        let err = Resolver::new(FactStore::builder().build())
            .resolve(&registry)
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(err.candidate(), Some("jmsConfiguration"));
    }

    #[test]
    fn test_parents_scope_without_parent_aborts_run() {
        let registry = CandidateRegistry::from_candidates([Candidate::factory("a", "A")
            .with_search_scope(SearchScope::Parents)
            .with_condition(Condition::bean_absent(BeanSearch::deduced()))])
        .unwrap();

        let err = Resolver::new(FactStore::builder().build())
            .resolve(&registry)
            .unwrap_err();
        assert!(matches!(err, ConditionError::MissingParentFactStore { ref candidate, .. } if candidate == "a"));
    }

    #[test]
    fn test_excluded_candidates_are_skipped_without_evaluation() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("jmsTemplate"),
            Candidate::new("jmsMessagingTemplate")
                .with_condition(Condition::bean_present(BeanSearch::named("jmsTemplate"))),
            // would abort the run if it were evaluated
            Candidate::new("broken").with_condition(Condition::bean_absent(BeanSearch::deduced())),
        ])
        .unwrap();
        let settings = ResolverSettings {
            debug: false,
            exclude: vec!["jmsTemplate".to_string(), "broken".to_string()],
        };

        let resolution = Resolver::new(FactStore::builder().build())
            .with_settings(settings)
            .resolve(&registry)
            .unwrap();

        let entry = resolution.trace().entry("jmsTemplate").unwrap();
        assert!(entry.excluded);
        assert!(entry.records.is_empty());
        assert!(!resolution.is_activated("jmsTemplate"));
        assert!(!resolution.is_activated("jmsMessagingTemplate"));
        assert!(resolution.trace().entry("broken").unwrap().excluded);
    }

    #[test]
    fn test_child_context_sees_frozen_parent() {
        let parent = resolve(
            FactStore::builder().build(),
            vec![Candidate::factory("transactionManager", "PlatformTransactionManager")],
        );

        let child_candidates = || {
            vec![
                Candidate::factory("anyScope", "PlatformTransactionManager")
                    .with_condition(Condition::bean_absent(BeanSearch::deduced())),
                Candidate::factory("currentScope", "PlatformTransactionManager")
                    .with_search_scope(SearchScope::Current)
                    .with_condition(Condition::bean_absent(BeanSearch::deduced())),
            ]
        };
        let child = resolve(
            FactStore::builder().parent(Arc::clone(parent.facts())).build(),
            child_candidates(),
        );

        assert!(!child.is_activated("anyScope"));
        assert!(child.is_activated("currentScope"));
        // the parent was only read
        assert_eq!(parent.facts().registrations().len(), 1);
    }

    #[test]
    fn test_child_inline_properties_do_not_leak_into_shared_environment() {
        let env = Arc::new(Environment::new());
        let feature = || {
            vec![Candidate::new("feature")
                .with_condition(Condition::property(PropertyCondition::new("feature.enabled")))]
        };

        let parent = resolve(FactStore::builder().environment(Arc::clone(&env)).build(), feature());
        let child = resolve(
            FactStore::builder()
                .environment(Arc::clone(&env))
                .property("feature.enabled", "false")
                .parent(Arc::clone(parent.facts()))
                .build(),
            feature(),
        );
        let later = resolve(FactStore::builder().environment(env).build(), feature());

        assert!(parent.is_activated("feature"));
        assert!(!child.is_activated("feature"));
        assert_eq!(parent.facts().property_value("feature.enabled"), None);
        assert!(later.is_activated("feature"));
    }

    #[test]
    fn test_listeners_receive_events_in_order() {
        #[derive(Default)]
        struct Recording {
            events: Mutex<Vec<String>>,
        }
        impl ResolutionListener for Recording {
            fn on_event(&self, event: &ResolutionEvent<'_>) {
                self.events.lock().push(event.event_name().to_string());
            }
        }

        let listener = Arc::new(Recording::default());
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("packages").with_phase(Phase::ParseConfiguration),
            Candidate::new("missing").with_condition(Condition::class_present("Missing")),
        ])
        .unwrap();

        Resolver::new(FactStore::builder().build())
            .with_listener(listener.clone())
            .resolve(&registry)
            .unwrap();

        assert_eq!(
            *listener.events.lock(),
            vec![
                "RunStarted",
                "PhaseStarted",
                "CandidateActivated",
                "PhaseStarted",
                "CandidateSkipped",
                "RunCompleted",
            ]
        );
    }
}
