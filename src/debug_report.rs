use resource_router::{Dispatch, DispatchMetrics, DispatchVerbose, Outcome, Verdict};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(path: &str, res: &DispatchVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Routing: \"{}\"", path), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    print_trace(&res.metrics, &palette);

    println!("\n{}", palette.paint("━━━ Outcome ━━━", ansi::GRAY));
    print_outcome(&res.dispatch, &palette);

    println!("\n{}", palette.paint("━━━ Globals ━━━", ansi::GRAY));
    print_globals(&res.dispatch, &palette);

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Before hook: {}  │  Lookups: {}",
        palette.paint(format!("{:?}", res.metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", res.metrics.before_hook)),
        palette.paint(res.metrics.lookups.to_string(), ansi::BLUE),
    );
    println!();
}

fn print_trace(metrics: &DispatchMetrics, palette: &ansi::Palette) {
    if metrics.trace.is_empty() {
        println!("{}", palette.dim("  No rules evaluated"));
        return;
    }

    for (idx, rule) in metrics.trace.iter().enumerate() {
        let verdict = match rule.verdict {
            Verdict::Selected | Verdict::Emitted => palette.paint(format!("✓ {}", rule.verdict), ansi::GREEN),
            Verdict::Rejected | Verdict::NotFound => palette.paint(format!("✗ {}", rule.verdict), ansi::RED),
            Verdict::Declined => palette.paint(format!("· {}", rule.verdict), ansi::YELLOW),
            Verdict::NoMatch => palette.dim(format!("· {}", rule.verdict)),
        };
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{}]", idx + 1), ansi::GRAY),
            palette.paint(&rule.rule, ansi::CYAN),
            palette.dim("│"),
            verdict
        );
        println!("      {} {}", palette.dim("regex:"), palette.dim(&rule.regex));
    }

    println!(
        "  {} considered, {} matched, {} rejected",
        metrics.rules_considered, metrics.rules_matched, metrics.rules_rejected
    );
}

fn print_outcome(dispatch: &Dispatch, palette: &ansi::Palette) {
    match &dispatch.outcome {
        Outcome::Template(template) => {
            let name = palette.bold(palette.paint(template.to_string(), ansi::GREEN));
            println!("  {} {}", palette.dim("template:"), name);
        }
        Outcome::Emit(response) => {
            println!(
                "  {} {} {}",
                palette.dim("emit:"),
                palette.paint(response.status.to_string(), ansi::GREEN),
                palette.dim(response.content_type.as_deref().unwrap_or("-"))
            );
            for (name, value) in &response.headers {
                println!("    {} {}", palette.paint(format!("{name}:"), ansi::BLUE), value);
            }
            if !response.body.is_empty() {
                println!("    {}", response.body.chars().take(200).collect::<String>());
            }
        }
        Outcome::NotFound => println!("  {}", palette.paint("404", ansi::RED)),
        Outcome::NotRoutable => {
            println!("  {}", palette.paint("not routable", ansi::YELLOW));
            if dispatch.is_page {
                println!("  {}", palette.dim("path is a reserved page path"));
            }
        }
    }

    if let Some(query) = &dispatch.query_string {
        println!("  {} {}", palette.dim("query string:"), palette.paint(query, ansi::BLUE));
    }
    if let Some(uri) = &dispatch.virtual_page_uri {
        println!("  {} {}", palette.dim("virtual page:"), palette.paint(uri, ansi::BLUE));
    }
}

fn print_globals(dispatch: &Dispatch, palette: &ansi::Palette) {
    let set: Vec<(&String, &String)> = dispatch.globals.iter().filter(|(_, v)| !v.is_empty()).collect();
    if set.is_empty() {
        println!("{}", palette.dim("  All route globals blank"));
        return;
    }
    for (key, value) in set {
        println!("  {} {}", palette.paint(key, ansi::BLUE), value);
    }
}
