use super::config::OutputFormat;
use core::fmt::Write;
use rowfeed::DisplayView;

/// Renders one display view in the requested format. The result has no
/// trailing newline.
pub fn render(view: &DisplayView, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(view)?),
        OutputFormat::Table => Ok(render_table(view)),
    }
}

fn render_table(view: &DisplayView) -> String {
    let mut out = format!(
        "-- batch {}/{} ({} shown)",
        view.epoch,
        view.tick,
        view.records.len()
    );
    for record in &view.records {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "\n{:>8} {:>3} {} {} {:>8} {}",
            record.id,
            record.quantity,
            record.fraction,
            record.color,
            record.child.id,
            record.child.color
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfeed::{ChildRef, Color, Fraction, Record};

    fn view() -> DisplayView {
        DisplayView {
            epoch: 2,
            tick: 7,
            records: vec![Record {
                id: "42".to_string(),
                quantity: 5,
                fraction: Fraction::from_atoms(1).unwrap(),
                color: Color::from_rgb(0x00ff00).unwrap(),
                child: ChildRef {
                    id: "1041".to_string(),
                    color: Color::BLACK,
                },
            }],
        }
    }

    #[test]
    fn table_has_header_and_one_line_per_record() {
        let text = render(&view(), OutputFormat::Table).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "-- batch 2/7 (1 shown)");
        assert_eq!(
            lines[1],
            "      42   5 0.000000000000000001 #00ff00     1041 #000000"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn json_is_a_single_line() {
        let text = render(&view(), OutputFormat::Json).unwrap();
        assert!(!text.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tick"], 7);
        assert_eq!(value["records"][0]["fraction"], "0.000000000000000001");
        assert_eq!(value["records"][0]["child"]["color"], "#000000");
    }

    #[test]
    fn empty_view_renders_header_only() {
        let text = render(&DisplayView::default(), OutputFormat::Table).unwrap();
        assert_eq!(text, "-- batch 0/0 (0 shown)");
    }
}
