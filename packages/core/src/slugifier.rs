//! Node names from titles

/// Turns a title into a node name
pub trait Slugifier {
    fn slugify(&self, text: &str) -> String;
}

/// Lowercase ASCII slugs: alphanumerics are kept, common Latin accents and
/// ligatures are transliterated, every other run of characters becomes a
/// single `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSlugifier;

impl DefaultSlugifier {
    fn transliterate(c: char) -> Option<&'static str> {
        Some(match c {
            'à' | 'á' | 'â' | 'ã' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Å' => "a",
            'ä' | 'Ä' | 'æ' | 'Æ' => "ae",
            'ç' | 'Ç' => "c",
            'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
            'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
            'ñ' | 'Ñ' => "n",
            'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => "o",
            'ö' | 'Ö' | 'œ' | 'Œ' => "oe",
            'ù' | 'ú' | 'û' | 'Ù' | 'Ú' | 'Û' => "u",
            'ü' | 'Ü' => "ue",
            'ý' | 'ÿ' | 'Ý' => "y",
            'ß' => "ss",
            _ => return None,
        })
    }
}

impl Slugifier for DefaultSlugifier {
    fn slugify(&self, text: &str) -> String {
        let mut slug = String::with_capacity(text.len());
        let mut pending_separator = false;

        for c in text.chars() {
            let piece = if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase().to_string())
            } else {
                Self::transliterate(c).map(str::to_string)
            };

            match piece {
                Some(piece) => {
                    if pending_separator && !slug.is_empty() {
                        slug.push('-');
                    }
                    pending_separator = false;
                    slug.push_str(&piece);
                }
                None => pending_separator = true,
            }
        }
        slug
    }
}
