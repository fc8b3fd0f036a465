use phonomorph::{CandidateSummary, ParseResultVerbose, TraceEvent};

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

pub fn print_run(input: &str, res: &ParseResultVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let details = &res.details;
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Parsing: \"{}\"", input), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Phases ━━━", ansi::GRAY));
    print_phases(res, &palette);

    if !details.trace.is_empty() {
        println!("\n{}", palette.paint("━━━ Trace ━━━", ansi::GRAY));
        print_trace(&details.trace, &palette);
    }

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    if res.results.is_empty() {
        println!("{}", palette.dim("  No analyses"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • No underlying form matched a lexical entry");
        println!("  • Every candidate was blocked by an environment or co-occurrence constraint");
        println!("  • Synthesis did not reproduce the input");
        println!("\n{}", palette.dim("  Tip: pass --trace or set PHONOMORPH_DEBUG_RULES=1 to see every rule event"));
    } else {
        for (idx, analysis) in res.results.iter().enumerate() {
            println!(
                "  {} {} {} {}",
                palette.paint(format!("[{}]", idx), ansi::GRAY),
                palette.bold(palette.paint(&analysis.underlying, ansi::GREEN)),
                palette.dim("│"),
                palette.paint(&analysis.gloss, ansi::YELLOW),
            );
            let allomorphs: Vec<String> = analysis.allomorphs.iter().map(|(m, i)| format!("{m}#{i}")).collect();
            println!(
                "      {} {}  {} {}",
                palette.dim("allomorphs:"),
                palette.paint(allomorphs.join(" "), ansi::BLUE),
                palette.dim("│ rank:"),
                palette.paint(analysis.rank.to_string(), ansi::CYAN)
            );
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    let phases: Vec<String> =
        details.phases.iter().map(|p| format!("{}: {}", p.phase, palette.dim(format!("{:?}", p.duration)))).collect();
    println!("  Total: {}  │  {}", palette.paint(format!("{:?}", details.total), ansi::GREEN), phases.join("  │  "));
    println!();
}

fn print_phases(res: &ParseResultVerbose, palette: &ansi::Palette) {
    for phase in &res.details.phases {
        println!(
            "  {} {}",
            palette.paint(format!("{}:", phase.phase), ansi::BLUE),
            if phase.produced > 0 {
                palette.paint(format!("✓ {} words", phase.produced), ansi::GREEN)
            } else {
                palette.dim(format!("✗ {} words", phase.produced))
            }
        );

        for candidate in phase.samples.iter().take(5) {
            println!("    {}", fmt_candidate_compact(candidate, palette));
        }
        if phase.produced > 5 {
            println!("    {}", palette.dim(format!("... +{} more", phase.produced - 5)));
        }
    }
}

fn print_trace(events: &[TraceEvent], palette: &ansi::Palette) {
    for event in events {
        let line = match event {
            TraceEvent::BeginStratum { mode, stratum } => palette.paint(format!("▶ {mode:?} {stratum}"), ansi::CYAN),
            TraceEvent::EndStratum { mode, stratum, outputs } => {
                palette.dim(format!("◀ {mode:?} {stratum} ({outputs} words)"))
            }
            TraceEvent::RuleUnapplied { rule } => format!("  {} {}", palette.paint("unapplied", ansi::BLUE), rule),
            TraceEvent::RuleApplied { rule } => format!("  {} {}", palette.paint("applied", ansi::GREEN), rule),
            TraceEvent::RuleNotApplied { mode, rule } => palette.dim(format!("  not applied ({mode:?}) {rule}")),
            TraceEvent::LexicalLookup { found } => {
                let found: Vec<String> = found.iter().map(ToString::to_string).collect();
                format!("  {} [{}]", palette.paint("lookup", ansi::YELLOW), found.join(", "))
            }
            TraceEvent::Blocked { morphemes, reason } => {
                let morphemes: Vec<String> = morphemes.iter().map(ToString::to_string).collect();
                format!("  {} {} {}", palette.paint("blocked", ansi::RED), morphemes.join("+"), palette.dim(reason))
            }
            TraceEvent::BranchError { rule, error } => {
                format!("  {} {} {}", palette.paint("dropped", ansi::RED), rule, palette.dim(error.to_string()))
            }
            TraceEvent::SuccessfulParse { morphemes } => {
                let morphemes: Vec<String> = morphemes.iter().map(ToString::to_string).collect();
                format!("  {} {}", palette.bold(palette.paint("parsed", ansi::GREEN)), morphemes.join("+"))
            }
        };
        println!("  {line}");
    }
}

fn fmt_candidate_compact(candidate: &CandidateSummary, palette: &ansi::Palette) -> String {
    let pending =
        if candidate.pending.is_empty() { String::new() } else { format!(" pending: {}", candidate.pending.join(" ")) };
    format!(
        "{} {}{}",
        palette.paint(&candidate.shape, ansi::YELLOW),
        palette.paint(if candidate.morphemes.is_empty() { "-" } else { candidate.morphemes.as_str() }, ansi::BLUE),
        palette.dim(pending)
    )
}
