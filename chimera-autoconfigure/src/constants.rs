/// 条件装配相关常量定义
///
/// 集中定义配置键、默认文件名以及常用的事实名称，
/// 确保启动流程、配置读取和 Demo 使用相同的标识符

/// 开启条件评估报告（info 级别输出）
pub const DEBUG_PROPERTY: &str = "debug";

/// 排除的候选标识列表
pub const EXCLUDE_PROPERTY: &str = "autoconfigure.exclude";

/// 日志相关配置键
pub const LOGGING_LEVEL_PROPERTY: &str = "logging.level";
pub const LOGGING_FORMAT_PROPERTY: &str = "logging.format";
pub const LOGGING_FILTER_PROPERTY: &str = "logging.filter";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// 保存自动配置基础包的 Bean 名称
///
/// 通常由 PARSE_CONFIGURATION 阶段的候选注册，供后续组件扫描使用
pub const AUTO_CONFIGURATION_PACKAGES_BEAN_NAME: &str = "autoConfigurationPackages";

/// 常见的 JTA TransactionManager JNDI 位置（按查找顺序）
pub const JTA_TRANSACTION_MANAGER_JNDI_NAMES: &[&str] = &[
    "java:comp/UserTransaction",
    "java:comp/TransactionManager",
    "java:appserver/TransactionManager",
    "java:pm/TransactionManager",
    "java:/TransactionManager",
];
