use serde::Deserialize;
use serde_json::Value;

use super::repo::MessageWithAuthor;
use crate::error::ApiError;

/// Message columns a caller may project or order by.
pub const LIST_FIELDS: &[&str] = &[
    "id",
    "user_id",
    "title",
    "content",
    "attachment",
    "likes",
    "created_at",
    "updated_at",
];

pub const ITEMS_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub attachment: Option<String>,
}

/// Raw query string of GET /messages.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub fields: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Validated listing options. `fields: None` means no projection.
#[derive(Debug)]
pub struct ListOptions {
    pub fields: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: i64,
    pub order_field: String,
    pub order_dir: Direction,
}

impl ListOptions {
    pub fn from_query(q: ListQuery) -> Result<Self, ApiError> {
        let fields = match q.fields.as_deref() {
            None | Some("*") => None,
            Some(list) => {
                let fields: Vec<String> = list.split(',').map(|f| f.trim().to_string()).collect();
                if fields.iter().any(|f| !LIST_FIELDS.contains(&f.as_str())) {
                    return Err(ApiError::validation("invalid fields"));
                }
                Some(fields)
            }
        };

        let limit = match q.limit {
            None => None,
            Some(l) if l < 0 => return Err(ApiError::validation("invalid parameters")),
            Some(l) => Some(l.min(ITEMS_LIMIT)),
        };

        let offset = match q.offset {
            None => 0,
            Some(o) if o < 0 => return Err(ApiError::validation("invalid parameters")),
            Some(o) => o,
        };

        let (order_field, order_dir) = match q.order.as_deref() {
            None => ("title".to_string(), Direction::Asc),
            Some(raw) => {
                let (field, dir) = match raw.split_once(':') {
                    None => (raw, Direction::Asc),
                    Some((field, dir)) => {
                        let dir = match dir.to_ascii_lowercase().as_str() {
                            "asc" => Direction::Asc,
                            "desc" => Direction::Desc,
                            _ => return Err(ApiError::validation("invalid order")),
                        };
                        (field, dir)
                    }
                };
                if !LIST_FIELDS.contains(&field) {
                    return Err(ApiError::validation("invalid order"));
                }
                (field.to_string(), dir)
            }
        };

        Ok(Self {
            fields,
            limit,
            offset,
            order_field,
            order_dir,
        })
    }
}

/// Serialize rows, keeping only the projected message fields. The owner's
/// username survives any projection.
pub fn project(rows: Vec<MessageWithAuthor>, fields: Option<&[String]>) -> Vec<Value> {
    rows.into_iter()
        .map(|row| {
            let mut value = serde_json::to_value(row).unwrap_or(Value::Null);
            if let (Some(fields), Value::Object(map)) = (fields, &mut value) {
                map.retain(|key, _| key == "username" || fields.iter().any(|f| f == key));
            }
            value
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn query(
        fields: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
        order: Option<&str>,
    ) -> ListQuery {
        ListQuery {
            fields: fields.map(String::from),
            limit,
            offset,
            order: order.map(String::from),
        }
    }

    #[test]
    fn defaults_are_unbounded_and_ordered_by_title() {
        let opts = ListOptions::from_query(ListQuery::default()).unwrap();
        assert_eq!(opts.fields, None);
        assert_eq!(opts.limit, None);
        assert_eq!(opts.offset, 0);
        assert_eq!(opts.order_field, "title");
        assert_eq!(opts.order_dir, Direction::Asc);
    }

    #[test]
    fn limit_is_capped_at_fifty() {
        let opts = ListOptions::from_query(query(None, Some(1000), None, None)).unwrap();
        assert_eq!(opts.limit, Some(50));
        let opts = ListOptions::from_query(query(None, Some(10), None, None)).unwrap();
        assert_eq!(opts.limit, Some(10));
    }

    #[test]
    fn negative_limit_or_offset_is_rejected() {
        assert!(ListOptions::from_query(query(None, Some(-1), None, None)).is_err());
        assert!(ListOptions::from_query(query(None, None, Some(-1), None)).is_err());
    }

    #[test]
    fn order_param_is_parsed_and_validated() {
        let opts = ListOptions::from_query(query(None, None, None, Some("likes:DESC"))).unwrap();
        assert_eq!(opts.order_field, "likes");
        assert_eq!(opts.order_dir, Direction::Desc);

        let opts = ListOptions::from_query(query(None, None, None, Some("created_at"))).unwrap();
        assert_eq!(opts.order_dir, Direction::Asc);

        assert!(ListOptions::from_query(query(None, None, None, Some("title;drop"))).is_err());
        assert!(ListOptions::from_query(query(None, None, None, Some("title:sideways"))).is_err());
    }

    #[test]
    fn star_and_absent_fields_mean_no_projection() {
        assert_eq!(
            ListOptions::from_query(query(Some("*"), None, None, None))
                .unwrap()
                .fields,
            None
        );
        let opts = ListOptions::from_query(query(Some("id,title"), None, None, None)).unwrap();
        assert_eq!(opts.fields, Some(vec!["id".to_string(), "title".to_string()]));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(ListOptions::from_query(query(Some("id,password_hash"), None, None, None)).is_err());
    }

    fn sample_row() -> MessageWithAuthor {
        MessageWithAuthor {
            id: 1,
            user_id: 2,
            title: "hello".into(),
            content: "world".into(),
            attachment: None,
            likes: 3,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            username: "alice".into(),
        }
    }

    #[test]
    fn projection_keeps_requested_fields_and_the_author() {
        let fields = vec!["id".to_string(), "likes".to_string()];
        let out = project(vec![sample_row()], Some(&fields));
        let obj = out[0].as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["id"], 1);
        assert_eq!(obj["likes"], 3);
        assert_eq!(obj["username"], "alice");
    }

    #[test]
    fn no_projection_returns_all_fields() {
        let out = project(vec![sample_row()], None);
        let obj = out[0].as_object().unwrap();
        assert!(obj.contains_key("content"));
        assert!(obj.contains_key("username"));
    }
}
