//! Specification-usage accounting.
//!
//! Usage is the complement of violations: which declared elements were
//! never exercised by any tested exchange. Folding a report in is a
//! monotonic union over the exercised sets; the serialized form is the
//! remaining unused elements.

use crate::report::{Coverage, Report};
use crate::spec::Specification;

/// Per-specification usage accumulator.
#[derive(Debug, Clone)]
pub struct Usage {
    declared: Coverage,
    exercised: Coverage,
}

impl Usage {
    pub fn new(spec: &Specification) -> Self {
        Self {
            declared: declared_elements(spec),
            exercised: Coverage::default(),
        }
    }

    /// Fold one report's coverage in. Never shrinks the exercised sets.
    pub fn fold(&mut self, report: &Report) {
        self.exercised.union_with(&report.coverage);
    }

    /// The seven unused-element sets: declared minus exercised.
    pub fn unused(&self) -> Coverage {
        self.declared.difference(&self.exercised)
    }
}

/// Enumerate every element a specification declares, keyed the same way
/// [`Coverage`] keys exercised elements.
fn declared_elements(spec: &Specification) -> Coverage {
    let mut declared = Coverage::default();
    for resource in &spec.resources {
        declared.add_resource(&resource.path);
        for action in &resource.actions {
            declared.add_action(&action.method, &resource.path);
            for name in &action.query_parameters {
                declared.add_query_parameter(name, &action.method, &resource.path);
            }
            for name in &action.headers {
                declared.add_request_header(name, &action.method, &resource.path);
            }
            for name in &action.form_parameters {
                declared.add_form_parameter(name, &action.method, &resource.path);
            }
            for response in &action.responses {
                declared.add_response_code(response.status, &action.method, &resource.path);
                for name in &response.headers {
                    declared.add_response_header(
                        name,
                        response.status,
                        &action.method,
                        &resource.path,
                    );
                }
            }
        }
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn spec() -> Specification {
        Specification::parse(
            r#"
title: T
resources:
  - path: /data
    actions:
      - method: GET
        query_parameters: [q]
        responses:
          - status: 200
  - path: /other
    actions:
      - method: POST
        responses:
          - status: 201
"#,
        )
        .unwrap()
    }

    fn report_touching_data(spec: &Arc<Specification>) -> Report {
        let mut coverage = Coverage::default();
        coverage.add_resource("/data");
        coverage.add_action("GET", "/data");
        coverage.add_query_parameter("q", "GET", "/data");
        coverage.add_response_code(200, "GET", "/data");
        Report {
            specification: Arc::clone(spec),
            request_violations: vec![],
            response_violations: vec![],
            coverage,
        }
    }

    #[test]
    fn fresh_usage_reports_everything_unused() {
        let usage = Usage::new(&spec());
        let unused = usage.unused();
        assert_eq!(unused.resources.len(), 2);
        assert_eq!(unused.actions.len(), 2);
        assert_eq!(unused.query_parameters.len(), 1);
        assert_eq!(unused.response_codes.len(), 2);
    }

    #[test]
    fn folding_a_report_shrinks_unused() {
        let spec = Arc::new(spec());
        let mut usage = Usage::new(&spec);
        usage.fold(&report_touching_data(&spec));

        let unused = usage.unused();
        assert_eq!(unused.resources.len(), 1);
        assert!(unused.resources.contains("/other"));
        assert!(unused.query_parameters.is_empty());
        assert!(unused.response_codes.contains("201 in POST /other"));
    }

    #[test]
    fn folding_is_monotonic() {
        let spec = Arc::new(spec());
        let mut usage = Usage::new(&spec);
        usage.fold(&report_touching_data(&spec));
        let before = usage.unused();

        // an empty-coverage report must not grow the unused sets back
        usage.fold(&Report {
            specification: Arc::clone(&spec),
            request_violations: vec!["x".into()],
            response_violations: vec![],
            coverage: Coverage::default(),
        });
        assert_eq!(usage.unused(), before);
    }
}
