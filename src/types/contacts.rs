use crate::ContactId;
use http::StatusCode;
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, SeqAccess, Visitor},
};
use serde_json::Value;
use std::fmt;

/// Sort direction for `orderByDir`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query parameters of `GET /api/contacts`.
///
/// `search` accepts Mautic's search grammar verbatim: `field:value` terms,
/// `+` (exact), `!` (not), `"quoted phrases"`, `OR`, parentheses and commands
/// such as `is:mine`, `email:*` or `segment:{alias}`. The server interprets it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactQuery {
    pub search: Option<String>,
    pub start: Option<u64>,
    pub limit: Option<u64>,
    pub order_by: Option<String>,
    pub order_by_dir: Option<OrderDirection>,
    pub published_only: Option<bool>,
    pub minimal: Option<bool>,
    /// Parameters the SDK does not model, passed through as-is.
    pub extra: Vec<(String, String)>,
}

impl ContactQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(value: impl Into<String>) -> Self {
        Self {
            search: Some(value.into()),
            ..Self::default()
        }
    }

    /// Parse a raw query string such as
    /// `search=email:ada@example.com OR company:acme&limit=50`.
    ///
    /// Values are percent-decoded but `+` is kept literally, so exact-match
    /// operators and addresses like `ada+news@example.com` survive.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        for part in raw.trim_start_matches('?').split('&') {
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            let key = decode(key);
            let value = decode(value);
            match key.as_str() {
                "search" => query.search = Some(value),
                "start" if value.parse::<u64>().is_ok() => query.start = value.parse().ok(),
                "limit" if value.parse::<u64>().is_ok() => query.limit = value.parse().ok(),
                "orderBy" => query.order_by = Some(value),
                "orderByDir" if value.eq_ignore_ascii_case("asc") => {
                    query.order_by_dir = Some(OrderDirection::Asc);
                }
                "orderByDir" if value.eq_ignore_ascii_case("desc") => {
                    query.order_by_dir = Some(OrderDirection::Desc);
                }
                "publishedOnly" if parse_flag(&value).is_some() => {
                    query.published_only = parse_flag(&value);
                }
                "minimal" if parse_flag(&value).is_some() => query.minimal = parse_flag(&value),
                _ => query.extra.push((key, value)),
            }
        }
        query
    }

    #[must_use]
    pub fn start(mut self, value: u64) -> Self {
        self.start = Some(value);
        self
    }

    #[must_use]
    pub fn limit(mut self, value: u64) -> Self {
        self.limit = Some(value);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, dir: OrderDirection) -> Self {
        self.order_by = Some(column.into());
        self.order_by_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn published_only(mut self, yes: bool) -> Self {
        self.published_only = Some(yes);
        self
    }

    #[must_use]
    pub fn minimal(mut self, yes: bool) -> Self {
        self.minimal = Some(yes);
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Query pairs in the order Mautic documents them.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let flag = |yes: bool| String::from(if yes { "1" } else { "0" });

        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search".to_owned(), search.clone()));
        }
        if let Some(start) = self.start {
            pairs.push(("start".to_owned(), start.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }
        if let Some(order_by) = &self.order_by {
            pairs.push(("orderBy".to_owned(), order_by.clone()));
        }
        if let Some(dir) = self.order_by_dir {
            pairs.push(("orderByDir".to_owned(), dir.as_str().to_owned()));
        }
        if let Some(yes) = self.published_only {
            pairs.push(("publishedOnly".to_owned(), flag(yes)));
        }
        if let Some(yes) = self.minimal {
            pairs.push(("minimal".to_owned(), flag(yes)));
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}

impl From<&str> for ContactQuery {
    fn from(value: &str) -> Self {
        Self::search(value)
    }
}

impl From<String> for ContactQuery {
    fn from(value: String) -> Self {
        Self::search(value)
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_owned())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Body of `GET /api/contacts`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ContactList {
    /// Total number of matches across all pages.
    #[serde(deserialize_with = "de_count")]
    pub total: u64,
    /// Contacts on this page.
    ///
    /// Mautic returns an object keyed by contact id; it is flattened here in
    /// key order. A plain array is accepted as well.
    #[serde(default, deserialize_with = "de_contacts")]
    pub contacts: Vec<Value>,
}

impl ContactList {
    /// Id of the first contact on the page.
    #[must_use]
    pub fn first_id(&self) -> Option<ContactId> {
        self.contacts
            .first()
            .and_then(|contact| contact.get("id"))
            .and_then(ContactId::from_json)
    }

    pub(crate) fn lookup(&self) -> ContactLookup {
        if self.total == 0 {
            return ContactLookup::NotFound;
        }
        self.first_id()
            .map_or(ContactLookup::NotFound, ContactLookup::Found)
    }
}

/// Outcome of a contact lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContactLookup {
    /// The first matching contact.
    Found(ContactId),
    /// The search matched nothing.
    NotFound,
    /// The server answered with a status other than 200.
    RequestFailed(StatusCode),
}

impl ContactLookup {
    #[must_use]
    pub fn id(&self) -> Option<&ContactId> {
        match self {
            Self::Found(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_id(self) -> Option<ContactId> {
        match self {
            Self::Found(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Successful answer to a contact create or update.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ContactWrite {
    pub status: StatusCode,
    /// Decoded JSON body, `Value::Null` when empty.
    pub body: Value,
}

impl ContactWrite {
    /// The `contact` object Mautic echoes back.
    #[must_use]
    pub fn contact(&self) -> Option<&Value> {
        self.body.get("contact")
    }

    #[must_use]
    pub fn id(&self) -> Option<ContactId> {
        self.contact()
            .and_then(|contact| contact.get("id"))
            .and_then(ContactId::from_json)
    }
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl de::Visitor<'_> for CountVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a count as a number or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom("negative count"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

/// Accepts `null`, an array, or an object keyed by id. Object entries keep the
/// order the server sent them in; the key becomes `id` when the entry lacks one.
fn de_contacts<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ContactsVisitor;

    impl<'de> Visitor<'de> for ContactsVisitor {
        type Value = Vec<Value>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of contacts or an object keyed by contact id")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Vec<Value>, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Vec<Value>, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Value>, A::Error> {
            let mut contacts = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(contact) = seq.next_element()? {
                contacts.push(contact);
            }
            Ok(contacts)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec<Value>, A::Error> {
            let mut contacts = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, mut contact)) = map.next_entry::<String, Value>()? {
                if let Value::Object(fields) = &mut contact {
                    fields.entry("id").or_insert(Value::String(id));
                }
                contacts.push(contact);
            }
            Ok(contacts)
        }
    }

    deserializer.deserialize_any(ContactsVisitor)
}
