//! TOML 候选清单
//!
//! ```toml
//! classpath = ["JmsTemplate", "ConnectionFactory"]
//!
//! [[candidate]]
//! id = "jmsTemplate"
//! produces = "JmsTemplate"
//!
//! [[candidate.conditions]]
//! kind = "class-present"
//! class = "ConnectionFactory"
//!
//! [[candidate.conditions]]
//! kind = "bean-absent"
//! ```
//!
//! 自定义条件只能在代码中声明。

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::candidate::{Candidate, Phase, SearchScope};
use crate::condition::{BeanSearch, Condition, PropertyCondition};
use crate::error::{ConditionError, ConditionResult};
use crate::fact::StaticClassManifest;
use crate::registry::CandidateRegistry;

/// 候选清单
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateManifest {
    /// 可解析的类名
    #[serde(default)]
    pub classpath: Vec<String>,

    #[serde(default, rename = "candidate")]
    pub candidates: Vec<CandidateDeclaration>,
}

/// 单个候选声明
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CandidateDeclaration {
    /// 缺省时由 `produces` 推导
    pub id: Option<String>,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub types: Vec<String>,
    pub produces: Option<String>,
    pub search: Option<SearchScope>,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionDeclaration>,
}

/// 条件声明，以 `kind` 区分
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConditionDeclaration {
    ClassPresent {
        class: String,
    },
    ClassAbsent {
        class: String,
    },
    BeanPresent(BeanSearchDeclaration),
    BeanAbsent(BeanSearchDeclaration),
    Property {
        key: String,
        #[serde(default, rename = "having-value")]
        having_value: Option<String>,
        #[serde(default = "default_match_if_missing", rename = "match-if-missing")]
        match_if_missing: bool,
    },
    Jndi {
        #[serde(default)]
        names: Vec<String>,
    },
    WebApplication,
    NotWebApplication,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BeanSearchDeclaration {
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub search: Option<SearchScope>,
}

fn default_match_if_missing() -> bool {
    true
}

impl From<BeanSearchDeclaration> for BeanSearch {
    fn from(declaration: BeanSearchDeclaration) -> Self {
        BeanSearch {
            types: declaration.types,
            names: declaration.names,
            scope: declaration.search,
        }
    }
}

impl From<ConditionDeclaration> for Condition {
    fn from(declaration: ConditionDeclaration) -> Self {
        match declaration {
            ConditionDeclaration::ClassPresent { class } => Condition::ClassPresent(class),
            ConditionDeclaration::ClassAbsent { class } => Condition::ClassAbsent(class),
            ConditionDeclaration::BeanPresent(search) => Condition::BeanPresent(search.into()),
            ConditionDeclaration::BeanAbsent(search) => Condition::BeanAbsent(search.into()),
            ConditionDeclaration::Property {
                key,
                having_value,
                match_if_missing,
            } => Condition::PropertyMatches(PropertyCondition {
                key,
                having_value,
                match_if_missing,
            }),
            ConditionDeclaration::Jndi { names } => Condition::JndiAvailable(names),
            ConditionDeclaration::WebApplication => Condition::WebApplication,
            ConditionDeclaration::NotWebApplication => Condition::NotWebApplication,
        }
    }
}

impl CandidateDeclaration {
    /// 转换为候选
    pub fn into_candidate(self) -> ConditionResult<Candidate> {
        let mut candidate = match (self.id, self.produces) {
            (Some(id), Some(produces)) => Candidate::factory(id, produces),
            (Some(id), None) => Candidate::new(id),
            (None, Some(produces)) => Candidate::for_type(produces),
            (None, None) => {
                return Err(ConditionError::Manifest(
                    "candidate declares neither 'id' nor 'produces'".to_string(),
                ))
            }
        };

        candidate = candidate
            .with_phase(self.phase)
            .with_conditions(self.conditions.into_iter().map(Condition::from));
        if let Some(scope) = self.search {
            candidate = candidate.with_search_scope(scope);
        }
        for type_name in self.types {
            candidate = candidate.with_type(type_name);
        }
        for id in self.after {
            candidate = candidate.with_after(id);
        }
        for id in self.before {
            candidate = candidate.with_before(id);
        }
        Ok(candidate)
    }
}

impl CandidateManifest {
    /// 从字符串解析清单
    pub fn from_toml_str(content: &str) -> ConditionResult<Self> {
        toml::from_str(content).map_err(|e| ConditionError::Manifest(e.to_string()))
    }

    /// 从文件加载清单
    pub fn from_file(path: impl AsRef<Path>) -> ConditionResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConditionError::Manifest(format!("{}: {}", path.display(), e)))?;

        let manifest = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded candidate manifest {} ({} candidate(s), {} class(es))",
            path.display(),
            manifest.candidates.len(),
            manifest.classpath.len()
        );
        Ok(manifest)
    }

    /// 清单中声明的类路径事实
    pub fn class_manifest(&self) -> StaticClassManifest {
        StaticClassManifest::from_names(self.classpath.iter().cloned())
    }

    /// 按声明顺序注册候选，并应用排序提示
    pub fn into_registry(self) -> ConditionResult<CandidateRegistry> {
        let candidates = self
            .candidates
            .into_iter()
            .map(CandidateDeclaration::into_candidate)
            .collect::<ConditionResult<Vec<_>>>()?;

        let mut registry = CandidateRegistry::from_candidates(candidates)?;
        registry.apply_ordering_hints()?;
        Ok(registry)
    }
}
