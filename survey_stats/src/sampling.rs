//! Random samples of the messages behind each code.
//!
//! Samples are drawn from the random source given by the caller. With a fresh
//! `thread_rng` every run gives a different sample.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::*;
use crate::filters::opt_in;

/// Draws `min(size, pool.len())` distinct elements of the pool, uniformly.
pub fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], size: usize, rng: &mut R) -> Vec<T> {
    pool.choose_multiple(rng, size).cloned().collect()
}

/// For every episode, configuration and code, samples the raw text of the opt-in
/// messages labelled with that code.
pub fn sample_messages<R: Rng + ?Sized>(
    messages: &[Record],
    catalog: &AnalysisCatalog,
    sample_size: usize,
    rng: &mut R,
) -> Result<Vec<SampleMessage>, AnalysisErrors> {
    info!(
        "Sampling up to {} messages for each code of {} episodes",
        sample_size,
        catalog.rqa_plans.len()
    );
    let mut res: Vec<SampleMessage> = Vec::new();
    for plan in catalog.rqa_plans.iter() {
        for cc in plan.coding_configurations.iter() {
            let scheme = &cc.code_scheme;
            // Pools follow the order of the scheme.
            let mut pools: Vec<(&Code, Vec<&str>)> =
                scheme.codes.iter().map(|c| (c, Vec::new())).collect();

            for msg in messages.iter() {
                if !opt_in(msg, plan) {
                    continue;
                }
                let raw = match msg.raw_text(&plan.raw_field) {
                    Some(s) => s,
                    None => continue,
                };
                for label in msg.required_labels(cc)? {
                    let code = scheme.get_code(&label.code_id)?;
                    if let Some((_, pool)) = pools.iter_mut().find(|(c, _)| c.code_id == code.code_id)
                    {
                        pool.push(raw);
                    }
                }
            }

            for (code, pool) in pools.iter() {
                let picked = sample(pool, sample_size, rng);
                debug!(
                    "sample_messages: {} {}: {} of {} messages",
                    plan.dataset_name,
                    code.string_value,
                    picked.len(),
                    pool.len()
                );
                for m in picked {
                    res.push(SampleMessage {
                        episode: plan.dataset_name.clone(),
                        code_scheme: scheme.name.clone(),
                        code: code.string_value.clone(),
                        message: m.to_string(),
                    });
                }
            }
        }
    }
    Ok(res)
}
