//! Deterministic force-directed layout.
//!
//! Nodes start on a grid in input order, then a fixed number of iterations
//! apply pairwise repulsion (`k_rep / d²`) and edge attraction (`d * k_attr`)
//! with damped velocities. Final positions are min/max normalised into the
//! canvas minus padding. No randomness: identical input gives identical
//! output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::NodePosition;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    /// Grid row width for initial placement
    pub columns: usize,
    pub spacing: f64,
    pub iterations: usize,
    pub repulsion: f64,
    pub attraction: f64,
    pub damping: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 50.0,
            columns: 5,
            spacing: 150.0,
            iterations: 50,
            repulsion: 5000.0,
            attraction: 0.01,
            damping: 0.85,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

/// Lay out `nodes` (in the given order) connected by `edges`. Edges that
/// reference unknown nodes, and self-loops, are ignored.
pub fn force_layout(nodes: &[i64], edges: &[(i64, i64)], params: &LayoutParams) -> Vec<NodePosition> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let columns = params.columns.max(1);
    let mut bodies: Vec<Body> = (0..nodes.len())
        .map(|i| Body {
            x: (i % columns) as f64 * params.spacing,
            y: (i / columns) as f64 * params.spacing,
            ..Default::default()
        })
        .collect();

    let index: HashMap<i64, usize> = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let springs: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|(a, b)| Some((*index.get(a)?, *index.get(b)?)))
        .filter(|(a, b)| a != b)
        .collect();

    let mut forces = vec![(0.0f64, 0.0f64); bodies.len()];
    for _ in 0..params.iterations {
        forces.iter_mut().for_each(|f| *f = (0.0, 0.0));

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let dx = bodies[i].x - bodies[j].x;
                let dy = bodies[i].y - bodies[j].y;
                let dist = (dx * dx + dy * dy).sqrt().max(1.0);
                let f = params.repulsion / (dist * dist);
                let (fx, fy) = (dx / dist * f, dy / dist * f);
                forces[i].0 += fx;
                forces[i].1 += fy;
                forces[j].0 -= fx;
                forces[j].1 -= fy;
            }
        }

        for &(a, b) in &springs {
            let dx = bodies[b].x - bodies[a].x;
            let dy = bodies[b].y - bodies[a].y;
            let dist = (dx * dx + dy * dy).sqrt().max(1.0);
            let f = dist * params.attraction;
            let (fx, fy) = (dx / dist * f, dy / dist * f);
            forces[a].0 += fx;
            forces[a].1 += fy;
            forces[b].0 -= fx;
            forces[b].1 -= fy;
        }

        for (body, (fx, fy)) in bodies.iter_mut().zip(&forces) {
            body.vx = (body.vx + fx) * params.damping;
            body.vy = (body.vy + fy) * params.damping;
            body.x += body.vx;
            body.y += body.vy;
        }
    }

    let xs = normalize(bodies.iter().map(|b| b.x), params.width, params.padding);
    let ys = normalize(bodies.iter().map(|b| b.y), params.height, params.padding);
    nodes
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(&id, (x, y))| NodePosition { id, x, y })
        .collect()
}

/// Rescale values into `[padding, extent - padding]`. A zero span (or a
/// non-finite one) collapses to the centre.
fn normalize(values: impl Iterator<Item = f64> + Clone, extent: f64, padding: f64) -> Vec<f64> {
    let (min, max) = values
        .clone()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = max - min;
    let usable = (extent - 2.0 * padding).max(0.0);
    let centre = extent / 2.0;

    values
        .map(|v| {
            if !span.is_finite() || span < f64::EPSILON || !v.is_finite() {
                centre
            } else {
                padding.min(centre) + (v - min) / span * usable
            }
        })
        .collect()
}
