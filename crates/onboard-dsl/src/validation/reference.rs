use std::collections::{BTreeMap, BTreeSet, HashSet};
use crate::model::{EntryTemplate, FieldNode, OnboardingConfiguration, VisibilityRule, walk_fields};
use crate::utils::path::{is_valid_field_path, template_path};
use crate::validation::{ValidationError, error_codes, Validator};

/// Validates `dependsOn` references:
/// - the path is well formed
/// - it names a declared field (entry indices are ignored)
/// - no visibility chain loops back on itself
pub struct ReferenceValidator;

/// A visibility rule together with its owner and location
struct RuleSite {
    owner: String,
    rule: VisibilityRule,
    path: String,
}

impl ReferenceValidator {
    /// Create a new reference validator
    pub fn new() -> Self {
        ReferenceValidator
    }
    
    /// Collect every rule in the configuration along with the dependency
    /// graph between declared field paths.
    ///
    /// A field depends on its rule's target, on its enclosing container,
    /// and on the target of its step's rule.
    fn collect(
        &self,
        configuration: &OnboardingConfiguration,
    ) -> (Vec<RuleSite>, BTreeSet<String>, BTreeMap<String, Vec<String>>) {
        let mut sites = Vec::new();
        let mut declared = BTreeSet::new();
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        
        for (step_idx, step) in configuration.steps.iter().enumerate() {
            let step_target = step.conditional_visibility.as_ref().map(|rule| {
                sites.push(RuleSite {
                    owner: format!("step '{}'", step.key),
                    rule: rule.clone(),
                    path: format!("steps[{}].conditionalVisibility", step_idx),
                });
                template_path(&rule.depends_on)
            });
            
            let mut step_sites = Vec::new();
            walk_fields(&step.fields, "", &mut |node: FieldNode<'_>, path: &str, depth: usize| {
                let (field, scalar_template) = match node {
                    FieldNode::Leaf(field) => (field, None),
                    FieldNode::Group { field, .. } => (field, None),
                    FieldNode::Array { field, entry: EntryTemplate::Scalar(template), .. } => (field, Some(template)),
                    FieldNode::Array { field, .. } => (field, None),
                };
                declared.insert(path.to_string());
                let edges = graph.entry(path.to_string()).or_default();
                
                if let Some(rule) = &field.conditional_visibility {
                    edges.push(template_path(&rule.depends_on));
                    step_sites.push(RuleSite {
                        owner: format!("field '{}'", path),
                        rule: rule.clone(),
                        path: format!("steps[{}].fields.{}.conditionalVisibility", step_idx, path),
                    });
                }
                // scalar entries are addressed through the array's own path
                if let Some(rule) = scalar_template.and_then(|t| t.conditional_visibility.as_ref()) {
                    let target = template_path(&rule.depends_on);
                    if target != path {
                        edges.push(target);
                    }
                    step_sites.push(RuleSite {
                        owner: format!("item template of '{}'", path),
                        rule: rule.clone(),
                        path: format!("steps[{}].fields.{}.itemTemplate.conditionalVisibility", step_idx, path),
                    });
                }
                if let Some((parent, _)) = path.rsplit_once('.') {
                    edges.push(parent.to_string());
                }
                if depth == 0 {
                    if let Some(target) = &step_target {
                        edges.push(target.clone());
                    }
                }
                true
            });
            sites.extend(step_sites);
        }
        
        (sites, declared, graph)
    }
    
    fn validate_references(&self, sites: &[RuleSite], declared: &BTreeSet<String>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        
        for site in sites {
            let depends_on = site.rule.depends_on.as_str();
            
            if !is_valid_field_path(depends_on) {
                errors.push(ValidationError {
                    code: error_codes::INVALID_REFERENCE,
                    message: format!(
                        "Invalid dependsOn '{}' on {}. Must be a dotted field path such as 'employers.0.name'",
                        depends_on, site.owner
                    ),
                    path: Some(site.path.clone()),
                });
                continue;
            }
            
            let target = template_path(depends_on);
            if !declared.contains(&target) {
                errors.push(ValidationError {
                    code: error_codes::INVALID_REFERENCE,
                    message: format!(
                        "{} depends on undeclared field '{}'",
                        capitalize(&site.owner),
                        depends_on
                    ),
                    path: Some(site.path.clone()),
                });
            }
        }
        
        errors
    }
    
    /// Detects cycles in the field dependency graph
    fn detect_circular_dependencies(&self, graph: &BTreeMap<String, Vec<String>>) -> Vec<ValidationError> {
        let mut visited = HashSet::with_capacity(graph.len());
        let mut path_set = HashSet::new();
        let mut cycles = Vec::new();
        
        for start_node in graph.keys() {
            if !visited.contains(start_node.as_str()) {
                Self::find_cycles(
                    start_node,
                    graph,
                    &mut visited,
                    &mut path_set,
                    &mut Vec::new(),
                    &mut cycles,
                );
            }
        }
        
        cycles
            .into_iter()
            .map(|cycle| {
                let mut formatted = cycle.join(" → ");
                formatted.push_str(" → ");
                formatted.push_str(&cycle[0]);
                ValidationError {
                    code: error_codes::CIRCULAR_DEPENDENCY,
                    message: format!("Circular visibility dependency detected: {}", formatted),
                    path: Some(cycle[0].clone()),
                }
            })
            .collect()
    }
    
    /// Depth-first search recording each loop found on the current path
    fn find_cycles<'a>(
        node: &'a str,
        graph: &'a BTreeMap<String, Vec<String>>,
        visited: &mut HashSet<&'a str>,
        path_set: &mut HashSet<&'a str>,
        current_path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if visited.contains(node) {
            return;
        }
        
        if path_set.contains(node) {
            if let Some(cycle_start) = current_path.iter().position(|&n| n == node) {
                cycles.push(current_path[cycle_start..].iter().map(|s| s.to_string()).collect());
            }
            return;
        }
        
        path_set.insert(node);
        current_path.push(node);
        
        if let Some(deps) = graph.get(node) {
            for dep in deps {
                Self::find_cycles(dep, graph, visited, path_set, current_path, cycles);
            }
        }
        
        path_set.remove(node);
        current_path.pop();
        visited.insert(node);
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Validator for ReferenceValidator {
    fn validate(&self, configuration: &OnboardingConfiguration) -> Vec<ValidationError> {
        let (sites, declared, graph) = self.collect(configuration);
        
        let mut errors = self.validate_references(&sites, &declared);
        errors.extend(self.detect_circular_dependencies(&graph));
        errors
    }
}
