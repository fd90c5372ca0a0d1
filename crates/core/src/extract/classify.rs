//! Offline keyword taxonomy shared by the fallback extractor.
//!
//! Groups are evaluated in order and the first hit wins, so groceries and travel are
//! checked before the broader shopping and food terms. Keywords and vendor names match as
//! plain substrings of the lower-cased context.

use crate::domain::expense::{Category, UNKNOWN_VENDOR};
use crate::extract::text::truncate_chars;

const OTHER_ITEM_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub sub_category: String,
    pub item: String,
}

/// How a matched group turns into (sub_category, item).
#[derive(Debug, Clone, Copy)]
enum Label {
    /// Fixed sub-category and item regardless of the keyword.
    Fixed { sub_category: &'static str, item: &'static str },
    /// Title-cased keyword as sub-category, keyword as item.
    Keyword,
    /// Fixed sub-category, first matching keyword as item.
    FirstKeyword { sub_category: &'static str },
}

struct KeywordGroup {
    category: Category,
    label: Label,
    keywords: &'static [&'static str],
}

static GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        category: Category::Groceries,
        label: Label::Fixed {
            sub_category: "Home groceries",
            item: "groceries",
        },
        keywords: &["grocery", "groceries", "vegetables", "fruits", "ration", "provisions"],
    },
    KeywordGroup {
        category: Category::Travel,
        label: Label::Keyword,
        keywords: &[
            "petrol", "diesel", "fuel", "gas", "uber", "ola", "taxi", "auto", "metro", "bus",
        ],
    },
    KeywordGroup {
        category: Category::Shopping,
        label: Label::FirstKeyword {
            sub_category: "Electronics",
        },
        keywords: &[
            "phone",
            "mobile",
            "laptop",
            "charger",
            "headphone",
            "earphone",
            "cable",
            "accessory",
            "accessories",
        ],
    },
    KeywordGroup {
        category: Category::Shopping,
        label: Label::FirstKeyword {
            sub_category: "Clothing",
        },
        keywords: &[
            "jeans", "shirt", "tshirt", "t-shirt", "shoes", "pants", "dress", "clothes",
        ],
    },
    KeywordGroup {
        category: Category::Food,
        label: Label::FirstKeyword {
            sub_category: "Restaurant/Delivery",
        },
        keywords: &[
            "pizza",
            "burger",
            "biryani",
            "food",
            "lunch",
            "dinner",
            "breakfast",
            "snacks",
            "coffee",
            "tea",
        ],
    },
    KeywordGroup {
        category: Category::Healthcare,
        label: Label::FirstKeyword {
            sub_category: "Medical",
        },
        keywords: &["medicine", "doctor", "hospital", "pharmacy", "medical", "clinic"],
    },
    KeywordGroup {
        category: Category::Bills,
        label: Label::FirstKeyword {
            sub_category: "Utility",
        },
        keywords: &[
            "electricity",
            "water",
            "internet",
            "mobile bill",
            "recharge",
            "broadband",
        ],
    },
];

/// Keyword -> display name, checked in order.
static VENDORS: &[(&str, &str)] = &[
    ("swiggy", "Swiggy"),
    ("zomato", "Zomato"),
    ("uber", "Uber"),
    ("ola", "Ola"),
    ("amazon", "Amazon"),
    ("flipkart", "Flipkart"),
    ("myntra", "Myntra"),
    ("ajio", "Ajio"),
    ("bigbasket", "BigBasket"),
    ("blinkit", "Blinkit"),
    ("zepto", "Zepto"),
    ("dunzo", "Dunzo"),
];

pub fn classify(context: &str) -> Classification {
    let context = context.to_lowercase();

    for group in GROUPS {
        let Some(keyword) = group
            .keywords
            .iter()
            .copied()
            .find(|kw| context.contains(kw))
        else {
            continue;
        };

        let (sub_category, item) = match group.label {
            Label::Fixed { sub_category, item } => (sub_category.to_string(), item.to_string()),
            Label::Keyword => (title_case(keyword), keyword.to_string()),
            Label::FirstKeyword { sub_category } => (sub_category.to_string(), keyword.to_string()),
        };

        return Classification {
            category: group.category,
            sub_category,
            item,
        };
    }

    Classification {
        category: Category::Other,
        sub_category: "Miscellaneous".to_string(),
        item: truncate_chars(context.trim(), OTHER_ITEM_CHARS),
    }
}

pub fn detect_vendor(context: &str) -> String {
    let context = context.to_lowercase();
    VENDORS
        .iter()
        .find(|(kw, _)| context.contains(kw))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(c: Classification) -> (Category, String, String) {
        (c.category, c.sub_category, c.item)
    }

    #[test]
    fn groceries_win_over_later_groups() {
        let c = classify("bought vegetables and a new phone");
        assert_eq!(c.category, Category::Groceries);
        assert_eq!(c.sub_category, "Home groceries");
        assert_eq!(c.item, "groceries");
    }

    #[test]
    fn travel_uses_title_cased_keyword() {
        assert_eq!(
            triple(classify("Petrol")),
            (Category::Travel, "Petrol".to_string(), "petrol".to_string())
        );
        assert_eq!(classify("uber to office").sub_category, "Uber");
    }

    #[test]
    fn item_is_first_keyword_in_group_order() {
        let c = classify("phone accessories");
        assert_eq!(
            triple(c),
            (Category::Shopping, "Electronics".to_string(), "phone".to_string())
        );
        let c = classify("new shoes and jeans");
        assert_eq!(c.sub_category, "Clothing");
        assert_eq!(c.item, "jeans");
    }

    #[test]
    fn covers_remaining_groups() {
        assert_eq!(classify("pizza night").category, Category::Food);
        assert_eq!(classify("pharmacy run").category, Category::Healthcare);
        let bills = classify("broadband");
        assert_eq!(bills.category, Category::Bills);
        assert_eq!(bills.sub_category, "Utility");
    }

    #[test]
    fn unmatched_context_is_other_with_truncated_item() {
        let c = classify("a very long description of something unusual");
        assert_eq!(c.category, Category::Other);
        assert_eq!(c.sub_category, "Miscellaneous");
        assert_eq!(c.item, "a very long description of som");
    }

    #[test]
    fn keywords_match_inside_longer_words() {
        let c = classify("iphone case");
        assert_eq!(
            triple(c),
            (Category::Shopping, "Electronics".to_string(), "phone".to_string())
        );
        assert_eq!(classify("smartphone").category, Category::Shopping);
        assert_eq!(classify("steak and beer").category, Category::Food);
    }

    #[test]
    fn classification_is_pure() {
        let input = "200 on lunch with team";
        assert_eq!(classify(input), classify(input));
    }

    #[test]
    fn detects_vendors_case_insensitively() {
        assert_eq!(detect_vendor("Bought pizza from SWIGGY"), "Swiggy");
        assert_eq!(detect_vendor("order on bigbasket"), "BigBasket");
        assert_eq!(detect_vendor("order via myswiggy app"), "Swiggy");
        assert_eq!(detect_vendor("corner shop"), UNKNOWN_VENDOR);
    }
}
