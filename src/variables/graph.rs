use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::VariableSpec;
use crate::error::{Result, StampError};
use crate::render::content::placeholder_names;

/// Edges from each declared variable to the declared variables its default references.
///
/// Builtins and caller-provided values are not nodes.
pub fn dependencies(specs: &[VariableSpec]) -> BTreeMap<&str, BTreeSet<&str>> {
    let declared: BTreeSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    specs
        .iter()
        .map(|spec| {
            let deps = spec
                .default
                .as_deref()
                .map(placeholder_names)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|name| declared.get(name.as_str()).copied())
                .collect();
            (spec.name.as_str(), deps)
        })
        .collect()
}

/// Order declared variables so every variable comes after the ones its default uses.
///
/// Kahn's algorithm, seeded in declaration order. When nodes are left over a cycle
/// exists, and the error reports one concrete cycle path.
pub fn resolution_order(specs: &[VariableSpec]) -> Result<Vec<String>> {
    let deps = dependencies(specs);

    let mut in_degree: BTreeMap<&str, usize> =
        deps.iter().map(|(name, d)| (*name, d.len())).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for spec in specs {
        for &dep in &deps[spec.name.as_str()] {
            dependents.entry(dep).or_default().push(spec.name.as_str());
        }
    }

    let mut queue: VecDeque<&str> = specs
        .iter()
        .map(|s| s.name.as_str())
        .filter(|name| in_degree[name] == 0)
        .collect();
    let mut order = Vec::with_capacity(specs.len());

    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() < specs.len() {
        let cycle = find_cycle(specs, &deps);
        return Err(StampError::CyclicVariableReference { cycle });
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first search that returns the first cycle found, closed with its starting name.
fn find_cycle(specs: &[VariableSpec], deps: &BTreeMap<&str, BTreeSet<&str>>) -> Vec<String> {
    let mut marks: BTreeMap<&str, Mark> = deps.keys().map(|k| (*k, Mark::Unvisited)).collect();
    let mut stack: Vec<&str> = Vec::new();

    for spec in specs {
        if marks[spec.name.as_str()] == Mark::Unvisited {
            if let Some(cycle) = visit(spec.name.as_str(), deps, &mut marks, &mut stack) {
                return cycle;
            }
        }
    }
    Vec::new()
}

fn visit<'a>(
    node: &'a str,
    deps: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    marks: &mut BTreeMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    marks.insert(node, Mark::OnStack);
    stack.push(node);

    for &next in &deps[node] {
        match marks[next] {
            Mark::OnStack => {
                let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, deps, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    None
}
