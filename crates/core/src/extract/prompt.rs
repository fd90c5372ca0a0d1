use chrono::NaiveDate;

/// Renders the extraction instructions for one message.
///
/// Pure: the same date, message and currency always produce the same prompt. The message is
/// embedded as a JSON string literal so quotes in user text cannot break the template.
pub fn build_prompt(today: NaiveDate, message: &str, currency: &str) -> String {
    let today = today.format("%Y-%m-%d");
    let quoted = serde_json::to_string(message).unwrap_or_else(|_| format!("\"{message}\""));

    format!(
        r#"You are an expense extraction AI. Extract ALL expenses from this message.

Today's date: {today}
User message: {quoted}

If there are MULTIPLE expenses, return a JSON array with multiple objects.
If there is ONE expense, still return an array with one object.

Return ONLY a valid JSON array (no markdown, no code fences, no explanation):

[
  {{
    "date": "{today}",
    "amount": <number>,
    "currency": "{currency}",
    "category": "<Food|Shopping|Travel|Entertainment|Bills|Healthcare|Groceries|Other>",
    "sub_category": "<specific type>",
    "item": "<product/service name only>",
    "vendor": "<platform name or Unknown>",
    "payment_mode": "<UPI|Cash|Card|Unknown>",
    "notes": "<brief context>"
  }}
]

Field rules:
- date: the day the expense happened, YYYY-MM-DD; use {today} unless the message says otherwise
- amount: the number only, no currency symbols
- currency: ISO code; use {currency} unless the message names another
- category: exactly one of Food, Shopping, Travel, Entertainment, Bills, Healthcare, Groceries, Other
- sub_category: a specific refinement such as Pizza, Electronics, Taxi, Movie
- item: SHORT product or service name ("groceries", "phone accessories", "petrol"), NOT a sentence
- vendor: platform or merchant (Swiggy, Zomato, Uber, Ola, Amazon, Flipkart, Myntra, BigBasket, Blinkit, Zepto) or "Unknown"
- payment_mode: UPI, Cash, Card or Unknown
- notes: brief context, NOT the full message

Category mapping:
- groceries, vegetables, fruits -> Groceries
- phone, mobile, electronics, clothes, shoes -> Shopping
- petrol, fuel, diesel, taxi, rides -> Travel
- restaurants, food delivery, snacks -> Food
- medicine, doctor -> Healthcare
- electricity, internet, recharge -> Bills
- movies, events, subscriptions -> Entertainment

Extract EVERY amount mentioned and match each amount with its own context.

Examples:

Input: "Spent 300 for groceries and 200 for phone accessories"
Output: [
  {{"date":"{today}","amount":300,"currency":"{currency}","category":"Groceries","sub_category":"Home groceries","item":"groceries","vendor":"Unknown","payment_mode":"Unknown","notes":"Home groceries"}},
  {{"date":"{today}","amount":200,"currency":"{currency}","category":"Shopping","sub_category":"Mobile accessories","item":"phone accessories","vendor":"Unknown","payment_mode":"Unknown","notes":"Mobile accessories"}}
]

Input: "Bought pizza from Swiggy for 500"
Output: [
  {{"date":"{today}","amount":500,"currency":"{currency}","category":"Food","sub_category":"Pizza","item":"pizza","vendor":"Swiggy","payment_mode":"Unknown","notes":"Food delivery"}}
]

Now extract from: {quoted}
Return the JSON array:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn embeds_date_message_and_currency() {
        let prompt = build_prompt(day(), "Spent 200 on coffee", "INR");
        assert!(prompt.contains("Today's date: 2026-10-16"));
        assert!(prompt.contains("User message: \"Spent 200 on coffee\""));
        assert!(prompt.contains("\"currency\": \"INR\""));
    }

    #[test]
    fn requires_array_and_forbids_markdown() {
        let prompt = build_prompt(day(), "x", "INR");
        assert!(prompt.contains("still return an array with one object"));
        assert!(prompt.contains("no markdown"));
        for category in crate::domain::expense::Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
    }

    #[test]
    fn worked_examples_are_valid_json() {
        let prompt = build_prompt(day(), "x", "INR");
        let start = prompt.find("Output: [").unwrap() + "Output: ".len();
        let end = start + prompt[start..].find("\n]").unwrap() + 2;
        let parsed: serde_json::Value = serde_json::from_str(&prompt[start..end]).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn quotes_in_message_are_escaped() {
        let prompt = build_prompt(day(), r#"paid 50 for "chai""#, "INR");
        assert!(prompt.contains(r#""paid 50 for \"chai\"""#));
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(
            build_prompt(day(), "100 for petrol", "INR"),
            build_prompt(day(), "100 for petrol", "INR")
        );
    }
}
