use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::constants;
use crate::error::{ConditionError, ConditionResult};

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 条件比较时使用的字符串形式
    ///
    /// 数组按逗号拼接；对象没有标量形式，返回 None
    pub fn to_property_string(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Array(values) => Some(
                values
                    .iter()
                    .filter_map(ConfigValue::to_property_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            ConfigValue::Object(_) => None,
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 属性事实的提供者
///
/// 合并后的配置源（配置文件、环境变量、内存配置），
/// 在一次解析过程中视为固定输入
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 当前激活的 profile
    active_profiles: RwLock<Vec<String>>,

    /// 下层环境（只读），自身配置源未命中时查询
    fallback: Option<Arc<Environment>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("sources_count", &self.sources.read().len())
            .field("layered", &self.fallback.is_some())
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
            fallback: None,
        }
    }

    /// 在已有环境之上创建新的一层
    ///
    /// 新加入的配置源只属于这一层，下层环境不会被修改
    pub fn layered_over(base: Arc<Environment>) -> Self {
        Self {
            fallback: Some(base),
            ..Self::new()
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!(
            "Adding property source '{}' (priority: {})",
            source.name(),
            source.priority()
        );
        sources.push(source);
        // 按优先级降序排序，稳定排序保证同优先级先加入者优先
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Property '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        drop(sources);
        if let Some(base) = &self.fallback {
            return base.get(key);
        }
        tracing::trace!("Property '{}' not found in any source", key);
        None
    }

    /// 获取属性的字符串形式，供 PropertyMatches 条件使用
    pub fn property_value(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.to_property_string())
    }

    /// 获取字符串配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(String::from))
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取布尔值配置（带默认值）
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// 获取字符串数组配置
    /// 支持两种格式:
    /// 1. TOML数组: key = ["a", "b", "c"]
    /// 2. 逗号分隔字符串: key = "a, b, c"
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            ConfigValue::Array(arr) => Some(
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
            ),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// 设置激活的 profile
    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    /// 获取激活的 profile，本层未设置时沿用下层
    pub fn get_active_profiles(&self) -> Vec<String> {
        let profiles = self.active_profiles.read().clone();
        match &self.fallback {
            Some(base) if profiles.is_empty() => base.get_active_profiles(),
            _ => profiles,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析器设置
///
/// 从 Environment 读取，控制报告输出以及候选排除
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverSettings {
    /// 以 info 级别输出条件评估报告
    pub debug: bool,

    /// 不参与评估、直接跳过的候选标识
    pub exclude: Vec<String>,
}

impl ResolverSettings {
    pub fn from_environment(environment: &Environment) -> Self {
        Self {
            debug: environment.get_bool_or(constants::DEBUG_PROPERTY, false),
            exclude: environment
                .get_string_array(constants::EXCLUDE_PROPERTY)
                .unwrap_or_default(),
        }
    }

    pub fn is_excluded(&self, candidate: &str) -> bool {
        self.exclude.iter().any(|id| id == candidate)
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.prefix,
            key.replace(['.', '-'], "_").to_uppercase()
        )
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> ConditionResult<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConditionError::PropertySource {
            name: name.clone(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&content, name)
    }

    /// 从字符串解析 TOML 配置
    pub fn from_toml_str(content: &str, name: impl Into<String>) -> ConditionResult<Self> {
        let name = name.into();
        let value: toml::Value =
            toml::from_str(content).map_err(|e| ConditionError::PropertySource {
                name: name.clone(),
                message: e.to_string(),
            })?;

        let mut properties = HashMap::new();
        Self::flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name,
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 展平 TOML 结构
    /// 例如: { database: { url: "xxx" } } -> { "database.url": "xxx" }
    fn flatten_toml(
        value: &toml::Value,
        prefix: String,
        result: &mut HashMap<String, ConfigValue>,
    ) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten_toml(val, new_prefix, result);
                }
            }
            other => {
                result.insert(prefix, Self::toml_value_to_config(other));
            }
        }
    }

    fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(arr) => {
                ConfigValue::Array(arr.iter().map(Self::toml_value_to_config).collect())
            }
            toml::Value::Table(table) => ConfigValue::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_value_to_config(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_source_flattens_tables() {
        let source = TomlPropertySource::from_toml_str(
            r#"
            debug = true

            [spring.jms]
            pub-sub-domain = false
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(source.get("debug"), Some(ConfigValue::Bool(true)));
        assert_eq!(
            source.get("spring.jms.pub-sub-domain"),
            Some(ConfigValue::Bool(false))
        );
    }

    #[test]
    fn test_invalid_toml_reports_source_name() {
        let err = TomlPropertySource::from_toml_str("debug = ", "broken.toml").err().unwrap();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_higher_priority_source_wins() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low")
                .with_property("feature.enabled", ConfigValue::Bool(false))
                .with_priority(0),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high")
                .with_property("feature.enabled", ConfigValue::Bool(true))
                .with_priority(10),
        ));

        assert_eq!(env.property_value("feature.enabled"), Some("true".to_string()));
    }

    #[test]
    fn test_property_string_forms() {
        assert_eq!(ConfigValue::Int(42).to_property_string(), Some("42".to_string()));
        assert_eq!(
            ConfigValue::Array(vec![
                ConfigValue::String("a".to_string()),
                ConfigValue::String("b".to_string()),
            ])
            .to_property_string(),
            Some("a,b".to_string())
        );
        assert_eq!(ConfigValue::Object(HashMap::new()).to_property_string(), None);
    }

    #[test]
    fn test_resolver_settings_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property(constants::DEBUG_PROPERTY, ConfigValue::String("yes".to_string()))
                .with_property(
                    constants::EXCLUDE_PROPERTY,
                    ConfigValue::String("jmsTemplate, dataSource".to_string()),
                ),
        ));

        let settings = ResolverSettings::from_environment(&env);
        assert!(settings.debug);
        assert!(settings.is_excluded("jmsTemplate"));
        assert!(settings.is_excluded("dataSource"));
        assert!(!settings.is_excluded("transactionManager"));
    }

    #[test]
    fn test_env_key_mapping() {
        let source = EnvironmentPropertySource::new("APP_");
        assert_eq!(source.key_to_env("spring.jms.pub-sub-domain"), "APP_SPRING_JMS_PUB_SUB_DOMAIN");
        assert_eq!(source.key_to_env("database.url"), "APP_DATABASE_URL");
    }
}
