use chmask_contracts::DateField;

const MASKED: &str = "'***'";
const MASKED_SHORT: &str = "'*'";
const NIL_UUID: &str = "'00000000-0000-0000-0000-000000000000'";

pub(crate) struct BuiltinTable {
    pub table_name: &'static str,
    pub date_field: DateField,
    pub columns: &'static [(&'static str, &'static str)],
}

pub(crate) const BUILTIN_TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        table_name: "chat_events",
        date_field: DateField::Date,
        columns: &[
            ("ip_address", MASKED),
            ("session_id", MASKED),
            ("conversation_id", NIL_UUID),
            ("exchange_id", NIL_UUID),
            ("text", MASKED),
            ("text_raw", MASKED),
            ("device_id", NIL_UUID),
            ("device_type", MASKED_SHORT),
            ("feedback_reason", MASKED),
            ("geo_continent_name", MASKED),
            ("geo_country_iso_code", MASKED),
            ("geo_country_name", MASKED),
            ("geo_region_name", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0.0"),
            ("geo_longitude", "0.0"),
            ("browser_language", MASKED),
        ],
    },
    BuiltinTable {
        table_name: "clicks_per_month",
        date_field: DateField::Date,
        columns: &[("query", MASKED), ("url", MASKED)],
    },
    BuiltinTable {
        table_name: "chat_exchanges",
        date_field: DateField::First,
        columns: &[
            ("ip_address", MASKED),
            ("device_type", MASKED_SHORT),
            ("geo_continent_name", MASKED),
            ("geo_country_iso_code", MASKED),
            ("geo_country_name", MASKED),
            ("geo_region_name", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0"),
            ("geo_longitude", "0"),
            ("question", MASKED),
            ("answer", MASKED),
            ("feedback_reason", MASKED),
            ("feedback_comment", MASKED),
            ("error_message", MASKED),
        ],
    },
    BuiltinTable {
        table_name: "chat_conversations",
        date_field: DateField::First,
        columns: &[
            ("ip_address", MASKED),
            ("device_type", MASKED_SHORT),
            ("geo_continent_name", MASKED),
            ("geo_country_iso_code", MASKED),
            ("geo_country_name", MASKED),
            ("geo_region_name", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0"),
            ("geo_longitude", "0"),
            ("original_question", MASKED),
            ("questions", "0"),
            ("answers", "0"),
            ("feedback_ratings", "0"),
            ("feedback_reasons", "0"),
            ("feedback_comments", "0"),
        ],
    },
    BuiltinTable {
        table_name: "search_summary_events",
        date_field: DateField::Date,
        columns: &[
            ("text", MASKED),
            ("text_raw", MASKED),
            ("feedback_reason", MASKED),
            ("ip_address", MASKED),
            ("session_id", MASKED),
            ("device_id", MASKED),
            ("user_agent", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0.0"),
            ("geo_longitude", "0.0"),
        ],
    },
    BuiltinTable {
        table_name: "search_summaries",
        date_field: DateField::First,
        columns: &[
            ("ip_address", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0.0"),
            ("geo_longitude", "0.0"),
            ("query", MASKED),
            ("summary", MASKED),
            ("feedback_reason", MASKED),
            ("feedback_comment", MASKED),
            ("error_message", MASKED),
        ],
    },
    BuiltinTable {
        table_name: "events",
        date_field: DateField::Date,
        columns: &[
            ("ip_address", MASKED),
            ("device_id", MASKED_SHORT),
            ("session_id", MASKED),
            ("geo_city_name", MASKED),
            ("geo_latitude", "0"),
            ("geo_longitude", "0"),
            ("user_agent", MASKED),
            ("query", MASKED),
            ("referrer_url", MASKED),
            ("referrer_title", MASKED),
            ("traits", "['***']"),
        ],
    },
];
