use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::utils::naming;

/// 候选的处理阶段
///
/// 所有 PARSE_CONFIGURATION 候选都在任何 REGISTER_BEAN 候选之前评估
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// 解析配置阶段 - 在任何 Bean 存在之前评估
    ParseConfiguration,

    /// 注册 Bean 阶段 - 随 Bean 注册依次评估
    RegisterBean,
}

impl Phase {
    /// 按处理顺序排列的所有阶段
    pub const ALL: [Phase; 2] = [Phase::ParseConfiguration, Phase::RegisterBean];
}

impl Default for Phase {
    fn default() -> Self {
        Phase::RegisterBean
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ParseConfiguration => write!(f, "PARSE_CONFIGURATION"),
            Phase::RegisterBean => write!(f, "REGISTER_BEAN"),
        }
    }
}

/// Bean 查找范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchScope {
    /// 只查找当前上下文
    Current,

    /// 只查找直接父上下文（不包含当前上下文和更上层的祖先）
    Parents,

    /// 查找当前上下文及全部祖先
    All,
}

impl Default for SearchScope {
    fn default() -> Self {
        SearchScope::All
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::Current => write!(f, "CURRENT"),
            SearchScope::Parents => write!(f, "PARENTS"),
            SearchScope::All => write!(f, "ALL"),
        }
    }
}

/// 候选组件声明
///
/// 激活后以 `id` 作为 Bean 名称注册，类型为 `types` 加上 `produces`。
/// 注册进 [`CandidateRegistry`](crate::registry::CandidateRegistry) 之后不再可变。
#[derive(Debug, Clone)]
pub struct Candidate {
    id: String,
    types: Vec<String>,
    produces: Option<String>,
    conditions: Vec<Condition>,
    phase: Phase,
    search_scope: Option<SearchScope>,
    after: Vec<String>,
    before: Vec<String>,
}

impl Candidate {
    /// 创建新的候选（REGISTER_BEAN 阶段，无条件）
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            produces: None,
            conditions: Vec::new(),
            phase: Phase::default(),
            search_scope: None,
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    /// 工厂方法式的候选：声明"我是类型 T 的工厂"
    ///
    /// 未指定类型和名称的 Bean 条件会使用 T 作为推断类型
    pub fn factory(id: impl Into<String>, produces: impl Into<String>) -> Self {
        Self::new(id).with_produces(produces)
    }

    /// 以产出类型推导标识，例如 `org.x.JmsTemplate` -> `jmsTemplate`
    pub fn for_type(produces: impl Into<String>) -> Self {
        let produces = produces.into();
        Self::factory(naming::default_bean_name(&produces), produces)
    }

    /// 设置处理阶段
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// 设置产出类型
    pub fn with_produces(mut self, produces: impl Into<String>) -> Self {
        self.produces = Some(produces.into());
        self
    }

    /// 追加注册类型
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.push(type_name.into());
        self
    }

    /// 追加条件（与已有条件 AND 组合）
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// 批量追加条件
    pub fn with_conditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// 设置 Bean 条件的默认查找范围
    pub fn with_search_scope(mut self, scope: SearchScope) -> Self {
        self.search_scope = Some(scope);
        self
    }

    /// 排序提示：在指定候选之后处理
    pub fn with_after(mut self, id: impl Into<String>) -> Self {
        self.after.push(id.into());
        self
    }

    /// 排序提示：在指定候选之前处理
    pub fn with_before(mut self, id: impl Into<String>) -> Self {
        self.before.push(id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn produces(&self) -> Option<&str> {
        self.produces.as_deref()
    }

    pub fn search_scope(&self) -> Option<SearchScope> {
        self.search_scope
    }

    pub fn after(&self) -> &[String] {
        &self.after
    }

    pub fn before(&self) -> &[String] {
        &self.before
    }

    /// 激活后注册的全部类型（去重，保持声明顺序）
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::with_capacity(self.types.len() + 1);
        for type_name in self.types.iter().chain(self.produces.iter()) {
            if !types.contains(type_name) {
                types.push(type_name.clone());
            }
        }
        types
    }

    /// 是否为无条件候选
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}
