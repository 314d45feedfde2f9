//! Next-token selection from raw logits.
//!
//! With sampling enabled the logits are temperature scaled, turned into a
//! distribution, truncated to the nucleus (the smallest set of tokens whose
//! cumulative probability reaches `top_p`) and sampled. Otherwise the argmax
//! is taken.

use rand::Rng;

use crate::{error::ServiceError, model::GenerationParameters};

pub fn sample_next<R: Rng>(
    logits: &[f32],
    params: &GenerationParameters,
    rng: &mut R,
) -> Result<u32, ServiceError> {
    if logits.is_empty() {
        return Err(ServiceError::Inference("model returned empty logits".into()));
    }
    if !params.do_sample || params.temperature <= 0.0 {
        return argmax(logits);
    }

    let probs = softmax(logits, params.temperature);
    let total: f32 = probs.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return argmax(logits);
    }

    let nucleus = nucleus(&probs, params.top_p);
    let mass: f32 = nucleus.iter().map(|(_, p)| p).sum();
    let mut draw = rng.gen_range(0.0..1.0f32) * mass;
    for &(idx, p) in &nucleus {
        if draw < p {
            return Ok(idx as u32);
        }
        draw -= p;
    }

    // Rounding can leave a sliver of mass unclaimed.
    Ok(nucleus.last().map(|(idx, _)| *idx as u32).unwrap_or(0))
}

pub fn argmax(logits: &[f32]) -> Result<u32, ServiceError> {
    logits
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx as u32)
        .ok_or_else(|| ServiceError::Inference("logits contain no finite values".into()))
}

fn softmax(logits: &[f32], temperature: f32) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    logits
        .iter()
        .map(|&v| {
            if v.is_nan() {
                0.0
            } else {
                ((v - max) / temperature).exp()
            }
        })
        .collect()
}

/// Candidates sorted by descending probability, cut once the normalized
/// cumulative mass reaches `top_p`. At least one token is always kept.
fn nucleus(probs: &[f32], top_p: f32) -> Vec<(usize, f32)> {
    let total: f32 = probs.iter().sum();
    let mut ranked: Vec<(usize, f32)> = probs
        .iter()
        .enumerate()
        .map(|(idx, &p)| (idx, p / total))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut cumulative = 0.0;
    let mut keep = 0;
    for (_, p) in &ranked {
        cumulative += p;
        keep += 1;
        if cumulative >= top_p {
            break;
        }
    }
    ranked.truncate(keep.max(1));
    ranked
}
