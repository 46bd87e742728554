//! Arm recovery CLI - Illuminate the intact arm, then adapt to damage.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use arm_recovery::{
    compute::evolution::{Archive, IlluminationSearch, task_fitness},
    compute::{AdaptationEngine, AdaptationResult, Arm, DamagedArm, Grid, Robot},
    schema::{DamageSpec, ExperimentConfig, damage_catalogue},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let all_damages = args.iter().any(|a| a == "--all-damages");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();

    if args.iter().any(|a| a == "--example") {
        print_example_config();
        return;
    }

    if positional.is_empty() {
        eprintln!("Usage: {} <config.json> [archive_out.json] [--all-damages]", args[0]);
        eprintln!();
        eprintln!("Illuminate the intact arm with MAP-Elites, then recover from damage with M-BOA.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json       Path to experiment configuration file");
        eprintln!("  archive_out.json  Write the illuminated archive here (optional)");
        eprintln!("  --all-damages     Adapt to every catalogue damage instead of the configured one");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(positional[0]);
    let archive_path = positional.get(1).map(|p| PathBuf::from(p.as_str()));

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: ExperimentConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    println!("Arm Damage Recovery");
    println!("===================");
    println!(
        "Arm: {} joints, {:.2} m reach",
        config.arm.joints, config.arm.length
    );
    println!(
        "Grid: {}x{} over +/-{:.2} m",
        config.grid.resolution, config.grid.resolution, config.grid.span
    );
    println!(
        "Illumination: {} iterations ({} bootstrap)",
        config.illumination.iterations, config.illumination.bootstrap
    );
    println!(
        "Target: ({:.3}, {:.3})",
        config.adaptation.target.x, config.adaptation.target.y
    );
    println!();

    // Phase (a): illumination
    let mut archive = Archive::new(Grid::from_config(&config.grid));
    let mut search = IlluminationSearch::new(&config).unwrap_or_else(|e| {
        eprintln!("Error creating search: {}", e);
        std::process::exit(1);
    });

    println!("Illuminating intact arm...");
    let stats = search
        .run_with_callback(&mut archive, |progress| {
            println!(
                "  Iteration {}/{}: filled={}, coverage={:.2}%, best={:.6}",
                progress.iteration,
                progress.total_iterations,
                progress.filled_cells,
                progress.coverage * 100.0,
                progress.best_performance
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Illumination failed: {}", e);
            std::process::exit(1);
        });

    let summary = archive.stats();
    println!();
    println!("Archive:");
    println!("  Filled cells: {}", summary.filled);
    println!("  Coverage: {:.2}%", summary.coverage * 100.0);
    println!("  Best performance: {:.6}", summary.best_performance);
    println!("  Mean performance: {:.6}", summary.mean_performance);
    println!("  QD score: {:.2}", summary.qd_score);
    println!(
        "  Time: {:.2}s ({:.0} evals/s)",
        stats.elapsed_seconds, stats.evaluations_per_second
    );

    if let Some(path) = archive_path {
        if let Err(e) = archive.save_json(&path) {
            eprintln!("Error writing archive: {}", e);
            std::process::exit(1);
        }
        println!("  Saved to {}", path.display());
    }
    println!();

    // Phase (b): adaptation
    let arm = Arm::from_config(&config.arm);
    if all_damages {
        println!("{:<36} {:>7} {:>10} {:>10}", "damage", "trials", "baseline", "adapted");
        for named in damage_catalogue() {
            if let Err(e) = named.spec.validate_for(config.arm.joints) {
                eprintln!("Skipping {}: {}", named.name, e);
                continue;
            }
            let start = Instant::now();
            let (baseline, result) = adapt(&archive, &config, arm, named.spec);
            println!(
                "{:<36} {:>7} {:>10.4} {:>10.4}  ({:.2}s)",
                named.name,
                result.trials.len(),
                -baseline,
                -best_observed(&result),
                start.elapsed().as_secs_f32()
            );
        }
        return;
    }

    println!("Adapting to damage {:?}...", config.damage);
    let start = Instant::now();
    let (baseline, result) = adapt(&archive, &config, arm, config.damage.clone());
    let elapsed = start.elapsed();

    for (i, trial) in result.trials.iter().enumerate() {
        println!(
            "  Trial {}: cell ({}, {}), distance={:.4}",
            i + 1,
            trial.cell.x,
            trial.cell.y,
            -trial.observed
        );
    }

    println!();
    println!("Result: {:?} after {} trials", result.stop_reason, result.trials.len());
    println!("  Un-adapted distance: {:.4}", -baseline);
    println!("  Adapted distance: {:.4}", -best_observed(&result));
    println!("  Time: {:.3}s", elapsed.as_secs_f32());
}

/// Run one adaptation and return the damaged task fitness of the intact
/// archive's predicted best alongside the result.
fn adapt(
    archive: &Archive,
    config: &ExperimentConfig,
    arm: Arm,
    damage: DamageSpec,
) -> (f64, AdaptationResult) {
    let robot = DamagedArm::new(arm, damage);
    let mut engine =
        AdaptationEngine::new(archive, config.adaptation.clone()).unwrap_or_else(|e| {
            eprintln!("Error creating adaptation engine: {}", e);
            std::process::exit(1);
        });

    let baseline = archive
        .lookup(engine.predicted_best().cell)
        .map(|entry| task_fitness(&robot.execute(&entry.controller), &config.adaptation.target))
        .unwrap_or(f64::NEG_INFINITY);

    let result = engine.run(&robot).unwrap_or_else(|e| {
        eprintln!("Adaptation failed: {}", e);
        std::process::exit(1);
    });
    (baseline, result)
}

fn best_observed(result: &AdaptationResult) -> f64 {
    result
        .best_trial
        .map_or(f64::NEG_INFINITY, |trial| trial.observed)
}

fn print_example_config() {
    let config = ExperimentConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("Example configuration (config.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
