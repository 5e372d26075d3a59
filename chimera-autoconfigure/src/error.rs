use thiserror::Error;

/// 应用层统一的错误类型
///
/// 启动流程（`AutoConfigurationApplication`）使用 anyhow::Result，
/// 通过 .context() 方法添加错误上下文信息。
pub use anyhow::Result;

/// 条件装配引擎的错误类型
///
/// 配置类错误（`UnspecifiedBeanSearch`、`MissingParentFactStore`）会中止整个解析过程，
/// 不会返回部分的激活集合，也绝不会被当作普通的 SKIPPED 结果。
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error(
        "Candidate '{candidate}': {condition} must specify at least one bean type or name, \
         and no produced type could be deduced"
    )]
    UnspecifiedBeanSearch { candidate: String, condition: String },

    #[error(
        "Candidate '{candidate}': {condition} uses search scope PARENTS \
         but the fact store has no parent"
    )]
    MissingParentFactStore { candidate: String, condition: String },

    #[error("Candidate '{candidate}': custom condition '{condition}' failed: {source}")]
    CustomConditionFailed {
        candidate: String,
        condition: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Candidate '{0}' is already registered")]
    DuplicateCandidate(String),

    #[error("Candidate ordering hints form a cycle: {}", .0.join(" -> "))]
    OrderingCycle(Vec<String>),

    #[error("Failed to load property source '{name}': {message}")]
    PropertySource { name: String, message: String },

    #[error("Invalid candidate manifest: {0}")]
    Manifest(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl ConditionError {
    /// 是否为候选声明本身的配置错误
    ///
    /// 这类错误说明声明存在缺陷，而不是运行时的缺失
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnspecifiedBeanSearch { .. } | Self::MissingParentFactStore { .. }
        )
    }

    /// 出错的候选标识（如果有）
    pub fn candidate(&self) -> Option<&str> {
        match self {
            Self::UnspecifiedBeanSearch { candidate, .. }
            | Self::MissingParentFactStore { candidate, .. }
            | Self::CustomConditionFailed { candidate, .. } => Some(candidate),
            Self::DuplicateCandidate(candidate) => Some(candidate),
            _ => None,
        }
    }
}

pub type ConditionResult<T> = std::result::Result<T, ConditionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_candidate_and_condition() {
        let err = ConditionError::UnspecifiedBeanSearch {
            candidate: "dataSource".to_string(),
            condition: "OnMissingBean".to_string(),
        };

        assert!(err.is_configuration_error());
        assert_eq!(err.candidate(), Some("dataSource"));
        let message = err.to_string();
        assert!(message.contains("dataSource"));
        assert!(message.contains("OnMissingBean"));
    }

    #[test]
    fn test_ordering_cycle_is_not_configuration_error() {
        let err = ConditionError::OrderingCycle(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);

        assert!(!err.is_configuration_error());
        assert_eq!(err.to_string(), "Candidate ordering hints form a cycle: a -> b -> a");
    }
}
