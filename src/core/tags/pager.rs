// Splits a sorted list of tag names into display pages.

/// Soft limit per page. A page is flushed before adding a name that would
/// push it past this; Discord's hard message cap is 2000.
pub const PAGE_CHAR_LIMIT: usize = 1800;

/// Join `names` with ", " into one page per `PAGE_CHAR_LIMIT` characters.
///
/// Names are never split or dropped: a single name longer than the limit
/// still gets a page of its own, and concatenating all pages reproduces
/// the input in order.
pub fn build_pages(names: &[String]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for name in names {
        if current.is_empty() {
            current.push_str(name);
            continue;
        }
        if current.len() + 2 + name.len() > PAGE_CHAR_LIMIT {
            pages.push(std::mem::take(&mut current));
            current.push_str(name);
        } else {
            current.push_str(", ");
            current.push_str(name);
        }
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_pages() {
        assert!(build_pages(&[]).is_empty());
    }

    #[test]
    fn short_list_fits_one_page() {
        let names = vec!["alpha".to_string(), "beta".to_string()];
        let pages = build_pages(&names);
        assert_eq!(pages, vec!["alpha, beta".to_string()]);
    }

    #[test]
    fn five_hundred_names_page_cleanly() {
        let names: Vec<String> = (0..500).map(|i| format!("{:03}", i)).collect();
        let pages = build_pages(&names);

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.len() <= 1900, "page too long: {}", page.len());
        }

        // Concatenating every page's names reproduces the input exactly.
        let rejoined: Vec<String> = pages
            .iter()
            .flat_map(|p| p.split(", ").map(str::to_string))
            .collect();
        assert_eq!(rejoined, names);
    }

    #[test]
    fn oversized_name_occupies_its_own_page() {
        let huge = "x".repeat(PAGE_CHAR_LIMIT + 100);
        let names = vec!["small".to_string(), huge.clone(), "tail".to_string()];
        let pages = build_pages(&names);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], huge);
        assert_eq!(pages[2], "tail");
    }
}
