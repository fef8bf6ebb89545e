diesel::table! {
    contact_queries (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        phone -> Nullable<Varchar>,
        company -> Nullable<Varchar>,
        subject -> Varchar,
        message -> Text,
        status -> Varchar,
        response -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    feedback (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        category -> Varchar,
        satisfaction -> Int4,
        would_recommend -> Nullable<Bool>,
        message -> Text,
        status -> Varchar,
        response -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    support_requests (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        subject -> Varchar,
        message -> Text,
        priority -> Varchar,
        product_area -> Nullable<Varchar>,
        status -> Varchar,
        response -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    technical_issues (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        title -> Varchar,
        description -> Text,
        severity -> Varchar,
        steps_to_reproduce -> Nullable<Text>,
        expected_behavior -> Nullable<Text>,
        actual_behavior -> Nullable<Text>,
        browser -> Nullable<Varchar>,
        operating_system -> Nullable<Varchar>,
        page_url -> Nullable<Varchar>,
        attachments -> Array<Text>,
        status -> Varchar,
        response -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
