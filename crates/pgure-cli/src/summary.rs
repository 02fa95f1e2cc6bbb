use std::path::Path;

use console::Style;
use pgure_core::frame::SequenceShape;
use pgure_core::pipeline::config::{DenoiseConfig, ThresholdMode};
use pgure_core::pipeline::DenoiseReport;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &DenoiseConfig, input: &Path, output: &Path, shape: SequenceShape) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("PGURE-SVT Denoising"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!("  {:<14}{}", s.label.apply_to("Sequence"), s.value.apply_to(shape));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Threads"),
        s.value.apply_to(config.worker_threads())
    );
    println!();

    println!("  {}", s.header.apply_to("Windowing"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Length"),
        s.value.apply_to(format!("{} frames", config.window_length))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Patch"),
        s.value.apply_to(format!(
            "{} px, step {}",
            config.patch.size, config.patch.overlap
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Motion"),
        s.value.apply_to(format!("{} px", config.motion.search_radius))
    );
    println!();

    println!("  {}", s.header.apply_to("Threshold"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(&config.threshold)
    );
    if let ThresholdMode::Adaptive {
        max_evaluations,
        warm_start,
        ..
    } = config.threshold
    {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Max evals"),
            s.value.apply_to(max_evaluations)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Warm start"),
            s.value.apply_to(if warm_start { "yes" } else { "no" })
        );
        if config.noise.estimate {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Noise"),
                s.method.apply_to(format!("estimated ({})", config.noise.method))
            );
        } else {
            print_fixed_noise(&s, config);
        }
    } else {
        print_fixed_noise(&s, config);
    }
    println!();

    println!("  {}", s.header.apply_to("Preprocessing"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Median"),
        s.value.apply_to(format!("{} px", config.preprocess.median_size))
    );
    if config.preprocess.hot_pixel_threshold > 0.0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Hot pixels"),
            s.value.apply_to(format!("{} sigma", config.preprocess.hot_pixel_threshold))
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Hot pixels"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();
}

fn print_fixed_noise(s: &Styles, config: &DenoiseConfig) {
    println!(
        "    {:<12}{}",
        s.label.apply_to("Noise"),
        s.value.apply_to(format!(
            "gain {}, offset {}, sigma {}",
            config.noise.gain, config.noise.offset, config.noise.sigma
        ))
    );
}

/// Per-frame table followed by the run totals.
pub fn print_report(report: &DenoiseReport) {
    let s = Styles::new();
    let rule = "-".repeat(65);

    println!("  {}", s.label.apply_to(&rule));
    println!(
        "  {:>5}{:>10}{:>10}{:>10}{:>10}{:>8}{:>12}",
        "Frame", "Gain", "Offset", "Sigma", "Lambda", "Evals", "Time (s)"
    );
    println!("  {}", s.label.apply_to(&rule));
    for f in &report.frames {
        let line = format!(
            "{:>5}{:>10.3}{:>10.3}{:>10.3}{:>10.5}{:>8}{:>12.3}",
            f.frame, f.noise.gain, f.noise.offset, f.noise.sigma, f.lambda, f.evaluations, f.seconds
        );
        if f.degenerate || !f.converged {
            println!("  {}", s.warning.apply_to(line));
        } else {
            println!("  {}", line);
        }
    }
    println!("  {}", s.label.apply_to(&rule));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Hot pixels"),
        s.value.apply_to(report.hot_pixels_corrected)
    );
    if report.non_converged > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Not converged"),
            s.warning.apply_to(report.non_converged)
        );
    }
    if report.degenerate_windows > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Blank windows"),
            s.warning.apply_to(report.degenerate_windows)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Total time"),
        s.value.apply_to(format!("{:.2} s", report.elapsed_secs))
    );
    println!();
}
