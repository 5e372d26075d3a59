//! 条件 - 守护候选激活的谓词
//!
//! 每种条件都是 (Fact Store 快照, 当前候选) 的纯函数，没有副作用。
//! 候选的多个条件按 AND 组合并短路：第一个不匹配的条件给出跳过原因。

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::candidate::{Candidate, Phase, SearchScope};
use crate::error::{ConditionError, ConditionResult};
use crate::fact::{ApplicationKind, FactStore};

/// 条件评估结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub message: String,
}

impl ConditionOutcome {
    pub fn matched(message: impl Into<String>) -> Self {
        Self {
            matched: true,
            message: message.into(),
        }
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self {
            matched: false,
            message: message.into(),
        }
    }

    fn when(matched: bool, message: String) -> Self {
        Self { matched, message }
    }
}

/// 条件种类，用于报告分组
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionKind {
    OnClass,
    OnMissingClass,
    OnBean,
    OnMissingBean,
    OnProperty,
    OnJndi,
    OnWebApplication,
    OnNotWebApplication,
    Custom(String),
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::OnClass => write!(f, "OnClass"),
            ConditionKind::OnMissingClass => write!(f, "OnMissingClass"),
            ConditionKind::OnBean => write!(f, "OnBean"),
            ConditionKind::OnMissingBean => write!(f, "OnMissingBean"),
            ConditionKind::OnProperty => write!(f, "OnProperty"),
            ConditionKind::OnJndi => write!(f, "OnJndi"),
            ConditionKind::OnWebApplication => write!(f, "OnWebApplication"),
            ConditionKind::OnNotWebApplication => write!(f, "OnNotWebApplication"),
            ConditionKind::Custom(name) => write!(f, "Custom({})", name),
        }
    }
}

/// Bean 查找规格
///
/// 类型和名称都为空时使用候选的产出类型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeanSearch {
    pub types: Vec<String>,
    pub names: Vec<String>,
    pub scope: Option<SearchScope>,
}

impl BeanSearch {
    /// 未指定类型和名称，依赖推断
    pub fn deduced() -> Self {
        Self::default()
    }

    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self::default().with_type(type_name)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::default().with_name(name)
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.push(type_name.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl fmt::Display for BeanSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "types={:?}, names={:?}", self.types, self.names)?;
        if let Some(scope) = self.scope {
            write!(f, ", scope={}", scope)?;
        }
        Ok(())
    }
}

/// 属性条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCondition {
    pub key: String,
    pub having_value: Option<String>,
    /// 属性未设置时是否匹配（默认 true）
    pub match_if_missing: bool,
}

impl PropertyCondition {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            having_value: None,
            match_if_missing: true,
        }
    }

    pub fn having_value(mut self, value: impl Into<String>) -> Self {
        self.having_value = Some(value.into());
        self
    }

    pub fn match_if_missing(mut self, match_if_missing: bool) -> Self {
        self.match_if_missing = match_if_missing;
        self
    }

    fn evaluate(&self, facts: &FactStore) -> ConditionOutcome {
        let Some(value) = facts.property_value(&self.key) else {
            return ConditionOutcome::when(
                self.match_if_missing,
                format!(
                    "property '{}' not set (match-if-missing={})",
                    self.key, self.match_if_missing
                ),
            );
        };

        match &self.having_value {
            Some(expected) => ConditionOutcome::when(
                value.eq_ignore_ascii_case(expected),
                format!(
                    "property '{}' = '{}' (expected '{}')",
                    self.key, value, expected
                ),
            ),
            None => ConditionOutcome::when(
                !value.eq_ignore_ascii_case("false"),
                format!("property '{}' = '{}'", self.key, value),
            ),
        }
    }
}

/// 条件评估上下文
pub struct ConditionContext<'a> {
    facts: &'a FactStore,
    candidate: &'a Candidate,
    phase: Phase,
}

impl<'a> ConditionContext<'a> {
    pub fn new(facts: &'a FactStore, candidate: &'a Candidate, phase: Phase) -> Self {
        Self {
            facts,
            candidate,
            phase,
        }
    }

    pub fn facts(&self) -> &'a FactStore {
        self.facts
    }

    pub fn candidate(&self) -> &'a Candidate {
        self.candidate
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

/// 自定义条件
///
/// 返回错误视为声明缺陷，会中止整个解析
pub trait CustomCondition: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, context: &ConditionContext<'_>) -> anyhow::Result<ConditionOutcome>;
}

/// 闭包形式的自定义条件
pub struct FnCondition<F> {
    name: String,
    predicate: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&ConditionContext<'_>) -> anyhow::Result<ConditionOutcome> + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> CustomCondition for FnCondition<F>
where
    F: Fn(&ConditionContext<'_>) -> anyhow::Result<ConditionOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, context: &ConditionContext<'_>) -> anyhow::Result<ConditionOutcome> {
        (self.predicate)(context)
    }
}

/// 条件
#[derive(Clone)]
pub enum Condition {
    ClassPresent(String),
    ClassAbsent(String),
    BeanPresent(BeanSearch),
    BeanAbsent(BeanSearch),
    PropertyMatches(PropertyCondition),
    /// 候选 JNDI 名称，第一个可解析的生效；为空时只要求命名服务存在
    JndiAvailable(Vec<String>),
    WebApplication,
    NotWebApplication,
    Custom(Arc<dyn CustomCondition>),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ClassPresent(name) => f.debug_tuple("ClassPresent").field(name).finish(),
            Condition::ClassAbsent(name) => f.debug_tuple("ClassAbsent").field(name).finish(),
            Condition::BeanPresent(search) => f.debug_tuple("BeanPresent").field(search).finish(),
            Condition::BeanAbsent(search) => f.debug_tuple("BeanAbsent").field(search).finish(),
            Condition::PropertyMatches(property) => {
                f.debug_tuple("PropertyMatches").field(property).finish()
            }
            Condition::JndiAvailable(names) => f.debug_tuple("JndiAvailable").field(names).finish(),
            Condition::WebApplication => write!(f, "WebApplication"),
            Condition::NotWebApplication => write!(f, "NotWebApplication"),
            Condition::Custom(custom) => f.debug_tuple("Custom").field(&custom.name()).finish(),
        }
    }
}

impl Condition {
    pub fn class_present(name: impl Into<String>) -> Self {
        Condition::ClassPresent(name.into())
    }

    pub fn class_absent(name: impl Into<String>) -> Self {
        Condition::ClassAbsent(name.into())
    }

    pub fn bean_present(search: BeanSearch) -> Self {
        Condition::BeanPresent(search)
    }

    pub fn bean_absent(search: BeanSearch) -> Self {
        Condition::BeanAbsent(search)
    }

    pub fn property(property: PropertyCondition) -> Self {
        Condition::PropertyMatches(property)
    }

    pub fn jndi<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::JndiAvailable(names.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> anyhow::Result<ConditionOutcome> + Send + Sync + 'static,
    {
        Condition::Custom(Arc::new(FnCondition::new(name, predicate)))
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::ClassPresent(_) => ConditionKind::OnClass,
            Condition::ClassAbsent(_) => ConditionKind::OnMissingClass,
            Condition::BeanPresent(_) => ConditionKind::OnBean,
            Condition::BeanAbsent(_) => ConditionKind::OnMissingBean,
            Condition::PropertyMatches(_) => ConditionKind::OnProperty,
            Condition::JndiAvailable(_) => ConditionKind::OnJndi,
            Condition::WebApplication => ConditionKind::OnWebApplication,
            Condition::NotWebApplication => ConditionKind::OnNotWebApplication,
            Condition::Custom(custom) => ConditionKind::Custom(custom.name().to_string()),
        }
    }

    /// 条件的简短描述，用于追踪记录
    pub fn describe(&self) -> String {
        match self {
            Condition::ClassPresent(name) | Condition::ClassAbsent(name) => name.clone(),
            Condition::BeanPresent(search) | Condition::BeanAbsent(search) => search.to_string(),
            Condition::PropertyMatches(property) => match &property.having_value {
                Some(value) => format!("{}={}", property.key, value),
                None => property.key.clone(),
            },
            Condition::JndiAvailable(names) => format!("{:?}", names),
            Condition::WebApplication | Condition::NotWebApplication => String::new(),
            Condition::Custom(custom) => custom.name().to_string(),
        }
    }

    /// 评估条件
    ///
    /// 只有声明缺陷（无法推断的 Bean 查找、缺少父 Fact Store、自定义条件出错）返回错误
    pub fn evaluate(&self, context: &ConditionContext<'_>) -> ConditionResult<ConditionOutcome> {
        let facts = context.facts();
        let outcome = match self {
            Condition::ClassPresent(name) => {
                let found = facts.class_resolvable(name);
                ConditionOutcome::when(
                    found,
                    format!(
                        "required class '{}' {}",
                        name,
                        if found { "found" } else { "not found" }
                    ),
                )
            }
            Condition::ClassAbsent(name) => {
                let found = facts.class_resolvable(name);
                ConditionOutcome::when(
                    !found,
                    format!(
                        "unwanted class '{}' {}",
                        name,
                        if found { "found" } else { "not found" }
                    ),
                )
            }
            Condition::BeanPresent(search) => {
                let matching = self.matching_beans(search, context)?;
                if matching.is_empty() {
                    ConditionOutcome::no_match(format!("found no beans matching {}", search))
                } else {
                    ConditionOutcome::matched(format!("found beans {:?}", matching))
                }
            }
            Condition::BeanAbsent(search) => {
                let matching = self.matching_beans(search, context)?;
                if matching.is_empty() {
                    ConditionOutcome::matched(format!("found no beans matching {}", search))
                } else {
                    ConditionOutcome::no_match(format!(
                        "found beans {:?} matching {}",
                        matching, search
                    ))
                }
            }
            Condition::PropertyMatches(property) => property.evaluate(facts),
            Condition::JndiAvailable(names) if names.is_empty() => ConditionOutcome::when(
                facts.jndi_available(),
                format!(
                    "JNDI environment {}",
                    if facts.jndi_available() {
                        "available"
                    } else {
                        "not available"
                    }
                ),
            ),
            Condition::JndiAvailable(names) => match facts.jndi_resolvable(names.as_slice()) {
                Some(location) => {
                    ConditionOutcome::matched(format!("found JNDI location '{}'", location))
                }
                None => ConditionOutcome::no_match(format!(
                    "none of the JNDI locations {:?} could be resolved",
                    names
                )),
            },
            Condition::WebApplication => {
                let web = facts.application_kind() == ApplicationKind::Web;
                ConditionOutcome::when(
                    web,
                    format!("{}a web application", if web { "" } else { "not " }),
                )
            }
            Condition::NotWebApplication => {
                let web = facts.application_kind() == ApplicationKind::Web;
                ConditionOutcome::when(
                    !web,
                    format!("{}a web application", if web { "" } else { "not " }),
                )
            }
            Condition::Custom(custom) => {
                custom
                    .matches(context)
                    .map_err(|source| ConditionError::CustomConditionFailed {
                        candidate: context.candidate().id().to_string(),
                        condition: custom.name().to_string(),
                        source,
                    })?
            }
        };

        tracing::trace!(
            "Candidate '{}' {} {}: matched={} ({})",
            context.candidate().id(),
            self.kind(),
            self.describe(),
            outcome.matched,
            outcome.message
        );
        Ok(outcome)
    }

    fn matching_beans(
        &self,
        search: &BeanSearch,
        context: &ConditionContext<'_>,
    ) -> ConditionResult<BTreeSet<String>> {
        let candidate = context.candidate();

        let mut types = search.types.clone();
        if types.is_empty() && search.names.is_empty() {
            match candidate.produces() {
                Some(produced) => types.push(produced.to_string()),
                None => {
                    return Err(ConditionError::UnspecifiedBeanSearch {
                        candidate: candidate.id().to_string(),
                        condition: self.kind().to_string(),
                    })
                }
            }
        }

        let scope = search
            .scope
            .or(candidate.search_scope())
            .unwrap_or_default();

        let facts: &FactStore = match scope {
            SearchScope::Parents => context.facts().parent().ok_or_else(|| {
                ConditionError::MissingParentFactStore {
                    candidate: candidate.id().to_string(),
                    condition: self.kind().to_string(),
                }
            })?,
            SearchScope::Current | SearchScope::All => context.facts(),
        };
        // PARENTS 只查直接父 Fact Store，不继续向上
        let consider_hierarchy = scope == SearchScope::All;

        let mut matching = BTreeSet::new();
        for type_name in &types {
            matching.extend(facts.bean_names_for_type(type_name, consider_hierarchy));
        }
        for name in &search.names {
            if facts.contains_bean(name, consider_hierarchy) {
                matching.insert(name.clone());
            }
        }
        Ok(matching)
    }
}
