//! Callbacks discovered by crawling a piece of the tree.
//!
//! On first paint every callback writing a component in the tree runs once.
//! When `children` change, the new subtree brings its own callbacks, and
//! callbacks whose multi-valued inputs lost components must rerun.

use std::collections::HashSet;
use serde_json::Value;
use switchyard_core::ComponentId;

use super::{
    ChangeType, ResolveError, ResolvedCallback, get_callback_by_output, get_callbacks_by_input,
    merge_by_resolved_id,
};
use crate::graph::DependencyGraphs;
use crate::layout::{PathSegment, Paths, component_id, crawl_layout};

/// Options of [`get_layout_callbacks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutCallbackOptions<'a> {
    /// Only collect callbacks writing components of the chunk.
    pub outputs_only: bool,
    /// Only collect callbacks whose multi-valued inputs included a component
    /// of the chunk. Used for removed subtrees.
    pub removed_array_inputs_only: bool,
    /// Location of the chunk; input-side callbacks writing only inside it
    /// are left to the output side.
    pub chunk_path: Option<&'a [PathSegment]>,
    /// Paths after the change, when `paths` describes the tree before it.
    pub new_paths: Option<&'a Paths>,
}

/// Callbacks to run because of the components in `chunk`.
///
/// Output-side discoveries are initial calls unless the definition prevents
/// it. Callbacks whose inputs are all missing or come only from callbacks
/// that were themselves dropped are excluded, and an initial call whose
/// inputs are all written by other collected callbacks is revoked: it runs
/// only if one of those producers actually changes something.
pub fn get_layout_callbacks(
    graphs: &DependencyGraphs,
    paths: &Paths,
    chunk: &Value,
    options: LayoutCallbackOptions<'_>,
) -> Result<Vec<ResolvedCallback>, ResolveError> {
    let collected = get_unfiltered_layout_callbacks(graphs, paths, chunk, options)?;
    let mut callbacks = exclude_unreachable(collected, paths)?;

    let mut produced = HashSet::new();
    for cb in &callbacks {
        for out in cb.flat_outputs(paths)? {
            produced.insert(out.combined());
        }
    }
    for cb in &mut callbacks {
        if !cb.initial_call {
            continue;
        }
        let inputs = cb.flat_inputs(paths)?;
        if !inputs.is_empty() && inputs.iter().all(|i| produced.contains(&i.combined())) {
            cb.initial_call = false;
        }
    }
    Ok(callbacks)
}

fn get_unfiltered_layout_callbacks(
    graphs: &DependencyGraphs,
    paths: &Paths,
    chunk: &Value,
    options: LayoutCallbackOptions<'_>,
) -> Result<Vec<ResolvedCallback>, ResolveError> {
    let mut ids: Vec<ComponentId> = Vec::new();
    crawl_layout(chunk, &mut Vec::new(), &mut |node, _| {
        if let Some(id) = component_id(node) {
            ids.push(id);
        }
    });

    let registrar = graphs.registrar();
    let mut found = Vec::new();
    for id in &ids {
        let (out_props, in_props): (Vec<&String>, Vec<&String>) = match id {
            ComponentId::Plain(_) if options.removed_array_inputs_only => continue,
            ComponentId::Plain(plain) => (
                registrar.outputs_of(plain).map(|m| m.keys().collect()).unwrap_or_default(),
                registrar.inputs_of(plain).map(|m| m.keys().collect()).unwrap_or_default(),
            ),
            ComponentId::Dict(dict) => {
                let key_string = dict.key_string();
                let outs = if options.removed_array_inputs_only {
                    Vec::new()
                } else {
                    registrar
                        .output_patterns(&key_string)
                        .map(|m| m.keys().collect())
                        .unwrap_or_default()
                };
                let ins = registrar
                    .input_patterns(&key_string)
                    .map(|m| m.keys().collect())
                    .unwrap_or_default();
                (outs, ins)
            }
        };

        for prop in out_props {
            if let Some(mut cb) = get_callback_by_output(graphs, id, prop)? {
                if !cb.callback.prevents_initial_call() {
                    cb.initial_call = true;
                    found.push(cb);
                }
            }
        }

        if options.outputs_only {
            continue;
        }
        for prop in in_props {
            for cb in get_callbacks_by_input(graphs, paths, id, prop, ChangeType::Indirect)? {
                if keep_input_side(&cb, id, paths, options)? {
                    found.push(cb);
                }
            }
        }
    }
    Ok(merge_by_resolved_id(found))
}

fn keep_input_side(
    cb: &ResolvedCallback,
    id: &ComponentId,
    paths: &Paths,
    options: LayoutCallbackOptions<'_>,
) -> Result<bool, ResolveError> {
    if options.removed_array_inputs_only {
        let inputs = cb.inputs(paths)?;
        let touched = cb
            .callback
            .inputs()
            .iter()
            .zip(&inputs)
            .any(|(spec, resolved)| spec.is_multi_valued() && resolved.iter().any(|p| p.id == *id));
        return Ok(touched);
    }
    if let Some(chunk_path) = options.chunk_path {
        let outputs = cb.flat_outputs(options.new_paths.unwrap_or(paths))?;
        return Ok(!outputs.iter().all(|o| o.path.starts_with(chunk_path)));
    }
    Ok(true)
}

/// Drop callbacks with no live source, repeatedly.
fn exclude_unreachable(
    mut callbacks: Vec<ResolvedCallback>,
    paths: &Paths,
) -> Result<Vec<ResolvedCallback>, ResolveError> {
    let mut exclusions: HashSet<String> = HashSet::new();
    loop {
        let mut included = Vec::with_capacity(callbacks.len());
        let mut excluded = Vec::new();
        for cb in callbacks {
            let all_multi = cb.callback.inputs().iter().all(|i| i.is_multi_valued());
            let reachable = all_multi
                || cb
                    .flat_inputs(paths)?
                    .iter()
                    .any(|i| !exclusions.contains(&i.combined()));
            if reachable {
                included.push(cb);
            } else {
                excluded.push(cb);
            }
        }
        if excluded.is_empty() {
            return Ok(included);
        }
        for cb in &excluded {
            for out in cb.flat_outputs(paths)? {
                exclusions.insert(out.combined());
            }
        }
        callbacks = included;
    }
}
