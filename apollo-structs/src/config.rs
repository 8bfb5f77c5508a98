use serde::Deserialize;
use serde::Serialize;

/// When `@include`/`@skip` conditions are applied relative to merging struct selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionPolicy {
    /// Conditions whose value is known (a literal, or a variable that was supplied) drop their
    /// selection before merging. A condition on a missing variable keeps its selection, so the
    /// merged selection covers every possible runtime outcome.
    #[default]
    EvaluateThenMerge,
    /// Conditions are ignored and every selection is merged.
    MergeAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructConfig {
    pub condition_policy: ConditionPolicy,
    /// Accept directives other than `@include`/`@skip` on struct field selections, unless they
    /// are declared for the `STRUCT_FIELD` location.
    pub allow_custom_field_directives: bool,
    /// Reject input fields that the target struct does not define.
    pub reject_unknown_input_fields: bool,
}

impl Default for StructConfig {
    fn default() -> Self {
        Self {
            condition_policy: ConditionPolicy::default(),
            allow_custom_field_directives: false,
            reject_unknown_input_fields: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config: StructConfig =
            serde_json::from_str(r#"{ "condition_policy": "merge_all" }"#).expect("valid config");
        assert_eq!(
            config,
            StructConfig {
                condition_policy: ConditionPolicy::MergeAll,
                ..Default::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_json::from_str::<StructConfig>(r#"{ "merge": true }"#)
            .expect_err("unknown key");
        assert!(err.to_string().contains("unknown field `merge`"));
    }
}
