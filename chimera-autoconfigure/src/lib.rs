// chimera-autoconfigure: 类似 Spring Boot 的条件自动装配引擎
//
// 根据声明式条件决定哪些可选组件应当激活：
// - 类路径、已有 Bean、属性值、JNDI 名称等条件
// - 按阶段、按声明顺序的单遍解析（无回溯）
// - 解析追踪与条件评估报告

pub mod activation;
pub mod app;
pub mod candidate;
pub mod condition;
pub mod config;
pub mod constants;
pub mod error;
pub mod fact;
pub mod listener;
pub mod logging;
pub mod manifest;
pub mod ordering;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod trace;
pub mod utils;

// 重新导出常用类型
pub use activation::{ActivationSet, CandidateState, Outcome};
pub use app::AutoConfigurationApplication;
pub use candidate::{Candidate, Phase, SearchScope};
pub use condition::{
    BeanSearch, Condition, ConditionContext, ConditionKind, ConditionOutcome, CustomCondition,
    FnCondition, PropertyCondition,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    ResolverSettings, TomlPropertySource,
};
pub use constants::*;
pub use error::{ConditionError, ConditionResult, Result};
pub use fact::{
    ApplicationKind, BeanRegistration, ClassResolver, FactStore, FactStoreBuilder, JndiResolver,
    RegistrationSource, StaticClassManifest, StaticJndiContext, TypeHierarchy,
};
pub use listener::{LoggingResolutionListener, ResolutionEvent, ResolutionListener};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use manifest::{BeanSearchDeclaration, CandidateDeclaration, CandidateManifest, ConditionDeclaration};
pub use registry::{load_candidates, CandidateRegistry, CandidateSubmission};
pub use report::ReportMode;
pub use resolver::{Resolution, Resolver};
pub use trace::{ConditionRecord, ResolutionTrace, TraceEntry};

// 导出 inventory，供 submit_candidate! 宏使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::AutoConfigurationApplication;
    pub use crate::candidate::{Candidate, Phase, SearchScope};
    pub use crate::condition::{
        BeanSearch, Condition, ConditionContext, ConditionOutcome, CustomCondition,
        PropertyCondition,
    };
    pub use crate::config::{self, ConfigValue, Environment, MapPropertySource, PropertySource};
    pub use crate::error::{ConditionError, ConditionResult, Result};
    pub use crate::fact::{ClassResolver, FactStore, JndiResolver, StaticJndiContext};
    pub use crate::listener::{LoggingResolutionListener, ResolutionEvent, ResolutionListener};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::manifest::CandidateManifest;
    pub use crate::registry::{load_candidates, CandidateRegistry};
    pub use crate::report::{self, ReportMode};
    pub use crate::resolver::{Resolution, Resolver};
    pub use crate::submit_candidate;
    pub use crate::utils;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
