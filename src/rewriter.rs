use crate::document::Document;
use crate::error::XmlError;
use crate::translator::Translate;

/// Indentation used when a rewritten feed is written back out.
pub const INDENT: usize = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub items: usize,
    pub translated: usize,
    pub untouched: usize,
}

/// Prepends a translation to the title of every item matched by `item_path`.
///
/// A title becomes `"{translated}<br/>{original}"` inside a CDATA section.
/// Items are processed one after another in document order; an item whose
/// translation fails, or which has no title, is left exactly as it was.
pub async fn rewrite_titles(
    doc: &mut Document,
    item_path: &str,
    title_path: &str,
    target_lang: &str,
    translator: &dyn Translate,
) -> Result<RewriteStats, XmlError> {
    let items = doc.select(item_path)?;
    let mut stats = RewriteStats {
        items: items.len(),
        ..Default::default()
    };

    for item in items {
        let Some(title) = doc.select_first_in(&item, title_path)? else {
            tracing::debug!("Item {:?} has no {} element, skipping", item, title_path);
            stats.untouched += 1;
            continue;
        };
        let Some(original) = doc.element(&title).map(|element| element.text()) else {
            stats.untouched += 1;
            continue;
        };
        if original.trim().is_empty() {
            stats.untouched += 1;
            continue;
        }

        match translator.translate(&original, target_lang).await {
            Ok(translated) => {
                if let Some(element) = doc.element_mut(&title) {
                    element.set_cdata(&format!("{translated}<br/>{original}"));
                    stats.translated += 1;
                }
            }
            Err(e) => {
                tracing::warn!("Keeping untranslated title {:?}: {}", original, e);
                stats.untouched += 1;
            }
        }
    }

    Ok(stats)
}

pub fn render(doc: &Document) -> Result<String, XmlError> {
    doc.to_string_indented(INDENT)
}
