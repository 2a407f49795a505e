//! Template size statistics against the platform's fixed limits.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{
    MAX_OUTPUTS, MAX_PARAMETERS, MAX_RESOURCES, MAX_TEMPLATE_BYTES, WARNING_THRESHOLD,
};
use crate::template::Template;

/// Counts and limit percentages of one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateStats {
    pub resource_count: usize,
    pub output_count: usize,
    pub parameter_count: usize,
    pub template_bytes: usize,
    pub resource_percent: f64,
    pub output_percent: f64,
    pub parameter_percent: f64,
    pub bytes_percent: f64,
    /// Resource type → count.
    pub resource_types: BTreeMap<String, usize>,
}

/// A measured quantity with a platform limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitMetric {
    Resources,
    Outputs,
    Parameters,
    TemplateBytes,
}

impl fmt::Display for LimitMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resources => "resources",
            Self::Outputs => "outputs",
            Self::Parameters => "parameters",
            Self::TemplateBytes => "template size (bytes)",
        })
    }
}

/// A metric at or above the warning threshold of its limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitWarning {
    pub metric: LimitMetric,
    pub value: usize,
    pub limit: usize,
    pub percent: f64,
}

impl LimitWarning {
    pub fn exceeded(&self) -> bool {
        self.value > self.limit
    }
}

impl fmt::Display for LimitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.exceeded() {
            "exceeds"
        } else {
            "approaches"
        };
        write!(
            f,
            "{} {state} the limit: {} of {} ({:.1}%)",
            self.metric, self.value, self.limit, self.percent
        )
    }
}

fn percent(value: usize, limit: usize) -> f64 {
    value as f64 / limit as f64 * 100.0
}

/// Count a template's resources, outputs, parameters, and bytes.
///
/// `size_hint` is the serialized size when the caller already knows it
/// (for instance the file length); otherwise the compact JSON rendering is
/// measured.
pub fn compute_stats(template: &Template, size_hint: Option<usize>) -> TemplateStats {
    let resource_count = template.resources().len();
    let output_count = template.outputs().map_or(0, |outputs| outputs.len());
    let parameter_count = template.parameters().map_or(0, |parameters| parameters.len());
    let template_bytes = size_hint.unwrap_or_else(|| {
        serde_json::to_string(template.document())
            .map(|text| text.len())
            .unwrap_or_default()
    });

    let mut resource_types = BTreeMap::new();
    for resource in template.resources() {
        *resource_types.entry(resource.resource_type.clone()).or_default() += 1;
    }

    TemplateStats {
        resource_count,
        output_count,
        parameter_count,
        template_bytes,
        resource_percent: percent(resource_count, MAX_RESOURCES),
        output_percent: percent(output_count, MAX_OUTPUTS),
        parameter_percent: percent(parameter_count, MAX_PARAMETERS),
        bytes_percent: percent(template_bytes, MAX_TEMPLATE_BYTES),
        resource_types,
    }
}

/// One warning per metric at or above 80% of its limit.
pub fn check_thresholds(stats: &TemplateStats) -> Vec<LimitWarning> {
    [
        (LimitMetric::Resources, stats.resource_count, MAX_RESOURCES),
        (LimitMetric::Outputs, stats.output_count, MAX_OUTPUTS),
        (LimitMetric::Parameters, stats.parameter_count, MAX_PARAMETERS),
        (LimitMetric::TemplateBytes, stats.template_bytes, MAX_TEMPLATE_BYTES),
    ]
    .into_iter()
    .filter(|&(_, value, limit)| value as f64 >= limit as f64 * WARNING_THRESHOLD)
    .map(|(metric, value, limit)| LimitWarning {
        metric,
        value,
        limit,
        percent: percent(value, limit),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn template_with(resources: usize, outputs: usize) -> Template {
        let mut resource_map = Map::new();
        for i in 0..resources {
            let kind = if i % 2 == 0 {
                "AWS::SQS::Queue"
            } else {
                "AWS::SNS::Topic"
            };
            resource_map.insert(format!("R{i}"), json!({ "Type": kind }));
        }
        let mut output_map = Map::new();
        for i in 0..outputs {
            output_map.insert(format!("O{i}"), json!({ "Value": "x" }));
        }
        Template::from_value(json!({ "Resources": resource_map, "Outputs": output_map })).unwrap()
    }

    #[test]
    fn test_counts_and_histogram() {
        let stats = compute_stats(&template_with(5, 2), None);
        assert_eq!(stats.resource_count, 5);
        assert_eq!(stats.output_count, 2);
        assert_eq!(stats.parameter_count, 0);
        assert_eq!(stats.resource_types["AWS::SQS::Queue"], 3);
        assert_eq!(stats.resource_types["AWS::SNS::Topic"], 2);
        assert!((stats.resource_percent - 1.0).abs() < 1e-9);
        assert!(stats.template_bytes > 0);
    }

    #[test]
    fn test_size_hint_wins() {
        let stats = compute_stats(&template_with(1, 0), Some(524_288));
        assert_eq!(stats.template_bytes, 524_288);
        assert!((stats.bytes_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds() {
        assert!(check_thresholds(&compute_stats(&template_with(399, 0), None)).is_empty());

        let warnings = check_thresholds(&compute_stats(&template_with(400, 0), None));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].metric, LimitMetric::Resources);
        assert!(!warnings[0].exceeded());

        let warnings = check_thresholds(&compute_stats(&template_with(10, 201), Some(2_000_000)));
        let metrics: Vec<LimitMetric> = warnings.iter().map(|w| w.metric).collect();
        assert_eq!(metrics, vec![LimitMetric::Outputs, LimitMetric::TemplateBytes]);
        assert!(warnings.iter().all(LimitWarning::exceeded));
        assert!(warnings[0].to_string().starts_with("outputs exceeds the limit"));
    }
}
