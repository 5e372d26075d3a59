//! Utility functions for the resolution engine
//!
//! Naming helpers used when deriving candidate identifiers and when
//! validating the class names handed to the class resolver.

/// Naming convention utilities for candidate and bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// # Examples
    ///
    /// ```
    /// use chimera_autoconfigure::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("JmsTemplate"), "jmsTemplate");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Returns the last path segment of a qualified type name.
    ///
    /// Both `.` and `::` separators are understood.
    ///
    /// ```
    /// use chimera_autoconfigure::utils::naming::short_type_name;
    ///
    /// assert_eq!(short_type_name("org.springframework.jms.core.JmsTemplate"), "JmsTemplate");
    /// assert_eq!(short_type_name("chimera::jms::JmsTemplate"), "JmsTemplate");
    /// assert_eq!(short_type_name("JmsTemplate"), "JmsTemplate");
    /// ```
    pub fn short_type_name(type_name: &str) -> &str {
        let after_path = type_name.rsplit("::").next().unwrap_or(type_name);
        after_path.rsplit('.').next().unwrap_or(after_path)
    }

    /// Default bean name for a produced type: short name in camelCase.
    pub fn default_bean_name(type_name: &str) -> String {
        to_camel_case(short_type_name(type_name))
    }

    /// Checks that a class name is syntactically usable.
    ///
    /// Empty names, whitespace and characters outside identifier segments
    /// separated by `.`, `::` or `$` are rejected. Malformed names are
    /// treated as absent classes by the fact store.
    pub fn is_well_formed_type_name(name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        name.split("::")
            .flat_map(|segment| segment.split('.'))
            .all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                    && !segment.starts_with(|c: char| c.is_ascii_digit())
            })
    }
}

#[cfg(test)]
mod tests {
    mod naming_tests {
        use super::super::naming::*;

        #[test]
        fn test_to_camel_case() {
            assert_eq!(to_camel_case("JmsTemplate"), "jmsTemplate");
            assert_eq!(to_camel_case("AB"), "aB");
            assert_eq!(to_camel_case("lowerCase"), "lowerCase");
        }

        #[test]
        fn test_default_bean_name() {
            assert_eq!(
                default_bean_name("org.springframework.transaction.jta.JtaTransactionManager"),
                "jtaTransactionManager"
            );
            assert_eq!(default_bean_name("crate::pool::ConnectionFactory"), "connectionFactory");
        }

        #[test]
        fn test_well_formed_type_names() {
            assert!(is_well_formed_type_name("javax.jms.ConnectionFactory"));
            assert!(is_well_formed_type_name("Outer$Inner"));
            assert!(is_well_formed_type_name("chimera::web::Server"));

            assert!(!is_well_formed_type_name(""));
            assert!(!is_well_formed_type_name("javax..jms"));
            assert!(!is_well_formed_type_name("has space"));
            assert!(!is_well_formed_type_name("trailing."));
            assert!(!is_well_formed_type_name("1Starts.WithDigit"));
            assert!(!is_well_formed_type_name("semi;colon"));
        }
    }
}
