use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::config::{Environment, EnvironmentPropertySource, ResolverSettings, TomlPropertySource};
use crate::constants;
use crate::error::Result;
use crate::fact::{ClassResolver, FactStore, FactStoreBuilder, JndiResolver};
use crate::listener::ResolutionListener;
use crate::logging::LoggingConfig;
use crate::manifest::CandidateManifest;
use crate::registry::{self, CandidateRegistry};
use crate::report::ReportMode;
use crate::resolver::{Resolution, Resolver};

/// 条件装配应用
///
/// 加载配置、构建 Fact Store、执行解析并输出条件评估报告
pub struct AutoConfigurationApplication {
    /// 应用名称
    name: String,

    /// 配置文件路径
    config_files: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 激活的 profiles
    profiles: Vec<String>,

    /// 日志配置
    logging_config: Option<LoggingConfig>,

    /// 是否安装全局日志订阅者
    init_logging: bool,

    /// 候选来源：显式注册表 > 清单文件 > inventory 声明
    registry: Option<CandidateRegistry>,
    manifest: Option<PathBuf>,

    class_resolver: Option<Arc<dyn ClassResolver>>,
    facts: FactStoreBuilder,
    listeners: Vec<Arc<dyn ResolutionListener>>,
}

impl AutoConfigurationApplication {
    /// 创建新的应用
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec![constants::DEFAULT_CONFIG_FILE.to_string()],
            env_prefix: constants::DEFAULT_ENV_PREFIX.to_string(),
            profiles: Vec::new(),
            logging_config: None,
            init_logging: true,
            registry: None,
            manifest: None,
            class_resolver: None,
            facts: FactStore::builder(),
            listeners: Vec::new(),
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    /// 添加多个配置文件
    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 设置激活的 profiles
    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    /// 设置日志配置
    ///
    /// 如果不设置，使用配置文件中的 logging.* 或环境变量
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 是否初始化日志系统（嵌入到已有日志的程序中时关闭）
    pub fn init_logging(mut self, init: bool) -> Self {
        self.init_logging = init;
        self
    }

    /// 使用给定的候选注册表
    pub fn candidates(mut self, registry: CandidateRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 从 TOML 清单加载候选；清单中的 classpath 作为默认的类路径事实
    pub fn manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    pub fn class_resolver(mut self, resolver: impl ClassResolver + 'static) -> Self {
        self.class_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn jndi_resolver(mut self, resolver: impl JndiResolver + 'static) -> Self {
        self.facts = self.facts.jndi_resolver(resolver);
        self
    }

    /// 添加解析开始前已存在的 Bean
    pub fn bean<I, S>(mut self, name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts = self.facts.bean(name, types);
        self
    }

    pub fn supertypes<I, S>(mut self, type_name: impl Into<String>, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facts = self.facts.supertypes(type_name, supertypes);
        self
    }

    /// 直接设置属性（优先级高于配置文件和环境变量）
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts = self.facts.property(key, value);
        self
    }

    /// 设置父上下文的 Fact Store
    pub fn parent(mut self, parent: Arc<FactStore>) -> Self {
        self.facts = self.facts.parent(parent);
        self
    }

    pub fn web_application(mut self, web: bool) -> Self {
        self.facts = self.facts.web_application(web);
        self
    }

    /// 添加解析监听器
    pub fn listener(mut self, listener: Arc<dyn ResolutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 运行应用
    pub fn run(self) -> Result<Resolution> {
        // 记录启动开始时间
        let start_time = std::time::Instant::now();

        // 解析 active profiles
        // 优先级：代码设置 > 环境变量 APP_PROFILES_ACTIVE
        let mut active_profiles = self.profiles.clone();
        if active_profiles.is_empty() {
            if let Ok(profiles_str) = std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix)) {
                active_profiles = profiles_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        // 加载配置文件（按优先级：default -> profile specific -> environment）
        let environment = Environment::new();
        let loaded = self.load_configurations(&environment, &active_profiles);

        // 添加环境变量配置源（优先级最高）
        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        environment.set_active_profiles(active_profiles.clone());

        // 初始化日志系统
        if self.init_logging {
            let logging_config = self
                .logging_config
                .clone()
                .unwrap_or_else(|| Self::logging_config_for(&environment));
            logging_config
                .init()
                .context("Failed to initialize logging")?;
        }

        tracing::info!("Starting {} condition resolution", self.name);
        for (path, priority) in &loaded {
            tracing::info!("Loaded configuration from: {} (priority: {})", path, priority);
        }
        if !active_profiles.is_empty() {
            tracing::info!("Active profiles: {:?}", active_profiles);
        } else {
            tracing::info!("No active profiles set, using default configuration");
        }
        tracing::debug!("Environment variable prefix: {}", self.env_prefix);

        let (registry, manifest_classes) = match (self.registry, &self.manifest) {
            (Some(registry), _) => (registry, None),
            (None, Some(path)) => {
                let manifest = CandidateManifest::from_file(path)
                    .with_context(|| format!("Failed to load candidate manifest {}", path.display()))?;
                let classes = manifest.class_manifest();
                (manifest.into_registry()?, Some(classes))
            }
            (None, None) => (registry::load_candidates()?, None),
        };

        let mut facts = self.facts.environment(Arc::new(environment));
        if let Some(resolver) = self.class_resolver {
            facts = facts.shared_class_resolver(resolver);
        } else if let Some(classes) = manifest_classes {
            facts = facts.class_resolver(classes);
        }
        let facts = facts.build();

        let settings = ResolverSettings::from_environment(facts.environment());
        let debug = settings.debug;

        let mut resolver = Resolver::new(facts).with_settings(settings);
        for listener in self.listeners {
            resolver = resolver.with_listener(listener);
        }

        let resolution = resolver
            .resolve(&registry)
            .with_context(|| format!("Condition resolution failed for {}", self.name))?;

        if debug {
            tracing::info!("{}", resolution.report(ReportMode::Debug));
        } else {
            tracing::debug!("{}", resolution.report(ReportMode::Summary));
        }

        tracing::info!(
            "Resolved {} in {}ms ({} of {} candidate(s) activated)",
            self.name,
            start_time.elapsed().as_millis(),
            resolution.activations().activated().len(),
            registry.len()
        );

        Ok(resolution)
    }

    /// 未显式设置日志配置时：配置文件中有 logging.* 则使用，否则读取环境变量
    fn logging_config_for(environment: &Environment) -> LoggingConfig {
        let configured = [
            constants::LOGGING_LEVEL_PROPERTY,
            constants::LOGGING_FORMAT_PROPERTY,
            constants::LOGGING_FILTER_PROPERTY,
        ]
        .iter()
        .any(|key| environment.get(key).is_some());

        if configured {
            LoggingConfig::from_environment(environment)
        } else {
            LoggingConfig::from_env()
        }
    }

    /// 加载配置文件
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml (default)
    /// 2. application-{profile}.toml (profile specific)
    ///
    /// 返回成功加载的文件及其优先级
    fn load_configurations(
        &self,
        environment: &Environment,
        active_profiles: &[String],
    ) -> Vec<(String, i32)> {
        let mut loaded = Vec::new();

        for base_config in &self.config_files {
            loaded.extend(Self::try_load_config_file(environment, base_config, 0));
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = Self::profile_config_path(base_config, profile);
                // profile 配置优先级高于默认配置
                loaded.extend(Self::try_load_config_file(
                    environment,
                    &profile_config,
                    10 + index as i32,
                ));
            }
        }

        loaded
    }

    /// 例如：application.toml -> application-dev.toml
    fn profile_config_path(base_path: &str, profile: &str) -> String {
        if let Some(dot_pos) = base_path.rfind('.') {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        } else {
            format!("{}-{}", base_path, profile)
        }
    }

    fn try_load_config_file(
        environment: &Environment,
        config_file: &str,
        priority: i32,
    ) -> Option<(String, i32)> {
        if !Path::new(config_file).exists() {
            return None;
        }
        match TomlPropertySource::from_file(config_file) {
            Ok(source) => {
                environment.add_property_source(Box::new(source.with_priority(priority)));
                Some((config_file.to_string(), priority))
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", config_file, e);
                None
            }
        }
    }
}

impl Default for AutoConfigurationApplication {
    fn default() -> Self {
        Self::new("AutoConfigurationApplication")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::condition::{BeanSearch, Condition, PropertyCondition};
    use crate::fact::StaticJndiContext;

    fn application() -> AutoConfigurationApplication {
        AutoConfigurationApplication::new("test")
            .init_logging(false)
            .config_file("does-not-exist.toml")
    }

    #[test]
    fn test_profile_config_path() {
        assert_eq!(
            AutoConfigurationApplication::profile_config_path("application.toml", "dev"),
            "application-dev.toml"
        );
        assert_eq!(
            AutoConfigurationApplication::profile_config_path("config/app", "prod"),
            "config/app-prod"
        );
    }

    #[test]
    fn test_run_with_explicit_registry() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("jmsTemplate")
                .with_condition(Condition::class_present("JmsTemplate"))
                .with_condition(Condition::property(PropertyCondition::new("spring.jms.enabled"))),
            Candidate::factory("transactionManager", "PlatformTransactionManager")
                .with_condition(Condition::jndi(constants::JTA_TRANSACTION_MANAGER_JNDI_NAMES.iter().copied()))
                .with_condition(Condition::bean_absent(BeanSearch::deduced())),
        ])
        .unwrap();

        let resolution = application()
            .candidates(registry)
            .class_resolver(|name: &str| name == "JmsTemplate")
            .jndi_resolver(StaticJndiContext::new().with_binding("java:/TransactionManager", "tm"))
            .run()
            .unwrap();

        assert!(resolution.is_activated("jmsTemplate"));
        assert!(resolution.is_activated("transactionManager"));
    }

    #[test]
    fn test_exclusions_from_properties() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("jmsTemplate"),
            Candidate::new("dispatcherServlet").with_condition(Condition::WebApplication),
        ])
        .unwrap();

        let resolution = application()
            .candidates(registry)
            .property(constants::EXCLUDE_PROPERTY, "jmsTemplate")
            .web_application(true)
            .run()
            .unwrap();

        assert!(!resolution.is_activated("jmsTemplate"));
        assert!(resolution.trace().entry("jmsTemplate").unwrap().excluded);
        assert!(resolution.is_activated("dispatcherServlet"));
    }

    #[test]
    fn test_configuration_error_is_reported_with_context() {
        let registry = CandidateRegistry::from_candidates([
            Candidate::new("broken").with_condition(Condition::bean_present(BeanSearch::deduced())),
        ])
        .unwrap();

        let err = application().candidates(registry).run().unwrap_err();
        assert!(err.to_string().contains("Condition resolution failed for test"));
        let source = err.downcast_ref::<crate::error::ConditionError>().unwrap();
        assert!(source.is_configuration_error());
    }
}
