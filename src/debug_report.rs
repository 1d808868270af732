use attrsel::{Session, Transition};

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

pub fn print_session(source: &str, session: &Session, outcomes: &[(&str, &str, Option<Transition>)], color: bool) {
    let palette = ansi::Palette::new(color);
    let source = if source == "-" { "<stdin>" } else { source };
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Service details: {source}"), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Attributes ━━━", ansi::GRAY));
    print_attributes(session, &palette);

    if !outcomes.is_empty() {
        println!("\n{}", palette.paint("━━━ Selections ━━━", ansi::GRAY));
        print_outcomes(outcomes, &palette);
    }

    let revealed = session.revealed();
    if !revealed.is_empty() {
        println!("\n{}", palette.paint("━━━ Revealed ━━━", ansi::GRAY));
        for level in &revealed {
            let options: Vec<String> = level
                .options
                .iter()
                .map(|o| {
                    let text = format!("{} ({})", o.name, o.id);
                    if level.selected.as_deref() == Some(o.id.as_str()) {
                        palette.bold(palette.paint(text, ansi::GREEN))
                    } else {
                        text
                    }
                })
                .collect();
            println!(
                "  {} {} {}",
                palette.paint(&level.label, ansi::BLUE),
                palette.dim(format!("← {}", level.parent)),
                options.join(", ")
            );
        }
    }

    let segments = session.segments();
    if !segments.is_empty() {
        println!("\n{}", palette.paint("━━━ Segments ━━━", ansi::GRAY));
        let selected = session.store().selected_segment().map(|s| s.id.as_str());
        for segment in &segments {
            let marker = if selected == Some(segment.id.as_str()) { "●" } else { "○" };
            println!(
                "  {} {} {}",
                palette.paint(marker, ansi::GREEN),
                segment.segment_name,
                palette.dim(format!("({})", segment.id))
            );
        }
    }

    println!("\n{}", palette.paint("━━━ Validation ━━━", ansi::GRAY));
    let report = session.validation();
    if report.is_valid {
        println!("  {}", palette.paint("✓ all required attributes selected", ansi::GREEN));
    }
    for error in &report.errors {
        println!("  {}", palette.paint(format!("✗ {error}"), ansi::RED));
    }
    println!(
        "  ready: {}",
        if session.is_ready() { palette.paint("yes", ansi::GREEN) } else { palette.paint("no", ansi::YELLOW) }
    );

    println!("\n{}", palette.paint("━━━ Filters ━━━", ansi::GRAY));
    if session.filters().is_empty() {
        println!("{}", palette.dim("  No filter entries"));
    }
    for (idx, entry) in session.filters().iter().enumerate() {
        println!(
            "  {} {} = {} {} {}",
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.paint(&entry.attribute_name, ansi::BLUE),
            palette.bold(&entry.option_name),
            palette.dim("│"),
            palette.paint(format!("{} → {:?}", entry.attribute_id, entry.option_id), ansi::YELLOW),
        );
    }

    let diagnostics: Vec<_> = session.diagnostics().collect();
    if !diagnostics.is_empty() {
        println!("\n{}", palette.paint("━━━ Diagnostics ━━━", ansi::GRAY));
        for diagnostic in diagnostics {
            println!("  {}", palette.paint(diagnostic.to_string(), ansi::YELLOW));
        }
    }
    println!();
}

fn print_attributes(session: &Session, palette: &ansi::Palette) {
    let views = session.attributes();
    if views.is_empty() {
        println!("{}", palette.dim("  No usable attribute groups"));
        return;
    }
    for view in &views {
        let required = if view.required { palette.paint("*", ansi::RED) } else { " ".to_string() };
        println!(
            "  {}{} {} {}",
            palette.bold(palette.paint(&view.name, ansi::BLUE)),
            required,
            palette.dim(format!("[{}]", view.kind.key())),
            palette.paint(view.selected.as_deref().unwrap_or("-"), ansi::GREEN),
        );
        for choice in &view.choices {
            println!("      {} {}", palette.dim(format!("{:>4}", choice.weight)), choice.name);
        }
    }
}

fn print_outcomes(outcomes: &[(&str, &str, Option<Transition>)], palette: &ansi::Palette) {
    for (attribute, option_id, transition) in outcomes {
        match transition {
            Some(t) => {
                println!(
                    "  {} {} = {}",
                    palette.paint("✓", ansi::GREEN),
                    palette.paint(*attribute, ansi::BLUE),
                    if option_id.is_empty() { palette.dim("(cleared)") } else { option_id.to_string() }
                );
                if !t.reveal.is_empty() {
                    println!("      {} {}", palette.dim("reveal:"), t.reveal.join(", "));
                }
                if !t.reset.is_empty() {
                    println!("      {} {}", palette.dim("reset:"), palette.paint(t.reset.join(", "), ansi::YELLOW));
                }
            }
            None => println!(
                "  {} {} = {} {}",
                palette.paint("✗", ansi::RED),
                palette.paint(*attribute, ansi::BLUE),
                option_id,
                palette.dim("(rejected)")
            ),
        }
    }
}
