//! Output rendering for view-state updates

use std::io::{self, Write};
use std::str::FromStr;

use libcinesearch::Movie;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Header line plus one `title<TAB>poster_url` line per result
    Text,
    /// One JSON array per update
    Json,
    /// One JSON object per result, followed by an empty line per update
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            _ => Err(format!(
                "Invalid output format: '{}'. Valid options: text, json, jsonl",
                s
            )),
        }
    }
}

/// Write one view-state update
pub fn render<W: Write>(out: &mut W, movies: &[Movie], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "{} results found", movies.len())?;
            for movie in movies {
                writeln!(out, "{}\t{}", movie.title, movie.poster_url)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, movies)?;
            writeln!(out)?;
        }
        OutputFormat::Jsonl => {
            for movie in movies {
                serde_json::to_writer(&mut *out, movie)?;
                writeln!(out)?;
            }
            writeln!(out)?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Movie> {
        vec![
            Movie::new("Iron Man", "https://img/iron-man.jpg"),
            Movie::new("Iron Fist", "N/A"),
        ]
    }

    fn rendered(movies: &[Movie], format: OutputFormat) -> String {
        let mut out = Vec::new();
        render(&mut out, movies, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_text() {
        assert_eq!(
            rendered(&sample(), OutputFormat::Text),
            "2 results found\nIron Man\thttps://img/iron-man.jpg\nIron Fist\tN/A\n"
        );
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(rendered(&[], OutputFormat::Text), "0 results found\n");
    }

    #[test]
    fn test_render_json() {
        let output = rendered(&sample(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["title"], "Iron Man");
        assert_eq!(parsed[1]["poster_url"], "N/A");
    }

    #[test]
    fn test_render_jsonl() {
        let output = rendered(&sample(), OutputFormat::Jsonl);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"title\":\"Iron Man\""));
        assert!(lines[1].contains("\"title\":\"Iron Fist\""));
        assert_eq!(lines[2], "");
    }
}
