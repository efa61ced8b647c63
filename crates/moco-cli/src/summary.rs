use std::path::PathBuf;

use console::Style;
use moco_core::config::MocoConfig;
use moco_core::pipeline::MultiStackJob;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_header(title: &str, inputs: &[&PathBuf], config: &MocoConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();

    for input in inputs {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Input"),
            s.path.apply_to(input.display())
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Engine"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("elastix"),
        s.value.apply_to(config.engine.elastix_bin.display())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Parameters"),
        s.path.apply_to(config.engine.parameter_dir.display())
    );
    if config.engine.testing {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Fidelity"),
            s.disabled.apply_to("testing")
        );
    }
    let workers = config
        .concurrency
        .workers
        .map(|n| n.to_string())
        .unwrap_or_else(|| "auto".to_string());
    println!(
        "    {:<12}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(workers)
    );
    println!(
        "    {:<12}{}s",
        s.label.apply_to("Timeout"),
        s.value.apply_to(config.engine.timeout_secs)
    );
    println!();

    println!("  {}", s.header.apply_to("Workspace"));
    if config.workspace.use_scratch {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Scratch"),
            s.path.apply_to(config.workspace.scratch_root.display())
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Scratch"),
            s.disabled.apply_to("in place")
        );
    }
    if !config.workspace.cleanup {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Cleanup"),
            s.disabled.apply_to("kept")
        );
    }
    println!();
}

pub fn print_alignment(job: &MultiStackJob) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Alignment"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Reference"),
        s.value.apply_to(job.reference_mode)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Siblings"),
        s.value.apply_to(job.siblings.len())
    );
    println!();
}

pub fn print_outputs(outputs: &[(&str, &PathBuf)]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Outputs"));
    for (label, path) in outputs {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.path.apply_to(path.display())
        );
    }
    println!();
}
