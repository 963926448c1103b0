use crate::error::ScrapeError;
use crate::loader::{ThresholdLoader, CLASS_COLUMN, SCHOOL_COLUMN, THRESHOLD_COLUMN};
use scraper::{ElementRef, Html, Selector};
use std::io::Write;
use tracing::{debug, info, warn};

const SCHOOL_LINK_MARKER: &str = "/progi-punktowe";
const CONTROL_LABELS: [&str; 4] = ["rozwiń", "zwiń", "więcej", "advertisement"];
const SCHOOL_NAME_MARKERS: [&str; 6] = ["lo ", " liceum", " licea", "sportowe", "im.", "im "];

/// One class row as printed on the listing page, threshold kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedClass {
    pub school: String,
    pub class_name: String,
    pub threshold: String,
}

pub struct ThresholdScraper {
    loader: ThresholdLoader,
}

impl Default for ThresholdScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdScraper {
    pub fn new() -> Self {
        Self {
            loader: ThresholdLoader::new(),
        }
    }

    pub fn scrape_file(&self, file_path: &str) -> Result<Vec<ScrapedClass>, ScrapeError> {
        let content = self.loader.load_file(file_path)?;
        parse_listing(&content)
    }

    /// Fetches the raw page; classes collapsed behind client-side scripts are not visible.
    pub async fn scrape_url(&self, url: &str) -> Result<Vec<ScrapedClass>, ScrapeError> {
        let content = self.loader.load_url(url).await?;
        parse_listing(&content)
    }
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn is_school_cell(cell: &ElementRef, link_selector: &Selector) -> bool {
    cell.select(link_selector).any(|link| {
        link.value()
            .attr("href")
            .map(|href| href != "#" && href.contains(SCHOOL_LINK_MARKER))
            .unwrap_or(false)
    })
}

fn looks_like_threshold(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if CONTROL_LABELS.contains(&lowered.as_str()) || lowered.contains("od") || lowered.contains("do") {
        return false;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let digits: String = cleaned.chars().filter(|c| !matches!(c, '.' | ',' | '-')).collect();

    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_class_name(text: &str) -> bool {
    let lowered = text.to_lowercase();
    !text.is_empty() && !SCHOOL_NAME_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Walks the listing table: a linked first cell opens a school, the
/// following rows with a numeric second cell are its classes.
pub fn parse_listing(content: &str) -> Result<Vec<ScrapedClass>, ScrapeError> {
    let document = Html::parse_document(content);
    let row_selector = selector("table tbody tr")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a")?;

    let mut classes = Vec::new();
    let mut current_school: Option<String> = None;

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 2 {
            continue;
        }

        let first = cell_text(&cells[0]);
        let second = cell_text(&cells[1]);

        if is_school_cell(&cells[0], &link_selector) {
            debug!(school = %first, "found school row");
            current_school = Some(first);
            continue;
        }

        let Some(school) = &current_school else {
            continue;
        };

        if !second.is_empty() && looks_like_threshold(&second) && looks_like_class_name(&first) {
            classes.push(ScrapedClass {
                school: school.clone(),
                class_name: first,
                threshold: second,
            });
        }
    }

    if classes.is_empty() {
        warn!("no class rows found in threshold listing");
    } else {
        info!(classes = classes.len(), "scraped threshold listing");
    }

    Ok(classes)
}

/// Writes the classes in the layout the loader reads.
pub fn write_csv<W: Write>(classes: &[ScrapedClass], writer: W) -> Result<(), ScrapeError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([SCHOOL_COLUMN, CLASS_COLUMN, THRESHOLD_COLUMN])?;
    for class in classes {
        writer.write_record([&class.school, &class.class_name, &class.threshold])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_csv;

    const LISTING_HTML: &str = r##"
<html><body>
<table>
  <thead><tr><th>Szkoła</th><th>Próg</th></tr></thead>
  <tbody>
    <tr><td>Orphan class</td><td>120,00</td></tr>
    <tr><td><a href="/progi-punktowe/szkola/1/I-LO">I LO im. Nowodworskiego</a></td><td>od 150 do 180</td></tr>
    <tr><td>1A (mat-fiz-inf)</td><td>172,45</td></tr>
    <tr><td>1B (biol-chem)</td><td>165.10</td></tr>
    <tr><td>1C</td><td><a href="#">rozwiń</a></td></tr>
    <tr><td>advertisement</td></tr>
    <tr><td><a href="/progi-punktowe/szkola/5/V-LO">V LO im. Witkowskiego</a></td><td>od 140</td></tr>
    <tr><td>1A (inf-mat-fiz)</td><td>180</td></tr>
    <tr><td>Liceum sportowe</td><td>130</td></tr>
    <tr><td>1D (hum)</td><td>brak</td></tr>
  </tbody>
</table>
</body></html>
"##;

    #[test]
    fn extracts_classes_under_their_school() {
        let classes = parse_listing(LISTING_HTML).unwrap();
        assert_eq!(
            classes,
            vec![
                ScrapedClass {
                    school: "I LO im. Nowodworskiego".to_string(),
                    class_name: "1A (mat-fiz-inf)".to_string(),
                    threshold: "172,45".to_string(),
                },
                ScrapedClass {
                    school: "I LO im. Nowodworskiego".to_string(),
                    class_name: "1B (biol-chem)".to_string(),
                    threshold: "165.10".to_string(),
                },
                ScrapedClass {
                    school: "V LO im. Witkowskiego".to_string(),
                    class_name: "1A (inf-mat-fiz)".to_string(),
                    threshold: "180".to_string(),
                },
            ]
        );
    }

    #[test]
    fn threshold_heuristics() {
        assert!(looks_like_threshold("172,45"));
        assert!(looks_like_threshold("150 pkt"));
        assert!(!looks_like_threshold("od 150"));
        assert!(!looks_like_threshold("zwiń"));
        assert!(!looks_like_threshold("brak"));
        assert!(!looks_like_class_name("XII LO im. Kopernika"));
        assert!(looks_like_class_name("1A (mat-fiz)"));
    }

    #[test]
    fn written_csv_loads_back() {
        let classes = parse_listing(LISTING_HTML).unwrap();
        let mut buffer = Vec::new();
        write_csv(&classes, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Szkoła,Klasa,Próg punktowy\n"));

        let dataset = parse_csv(&text);
        assert_eq!(dataset.schools.len(), 3);
        assert!((dataset.schools[0].threshold - 172.45).abs() < 1e-9);
        assert!((dataset.schools[1].threshold - 165.10).abs() < 1e-9);
        assert_eq!(dataset.profiles.len(), 2);
    }
}
