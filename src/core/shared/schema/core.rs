diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        name -> Nullable<Varchar>,
        password_hash -> Varchar,
        role -> Varchar,
        image -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        user_id -> Uuid,
        bio -> Nullable<Text>,
        location -> Nullable<Varchar>,
        website -> Nullable<Varchar>,
        company -> Nullable<Varchar>,
        job_title -> Nullable<Varchar>,
        skills -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    socials (id) {
        id -> Uuid,
        user_id -> Uuid,
        github -> Nullable<Varchar>,
        twitter -> Nullable<Varchar>,
        linkedin -> Nullable<Varchar>,
        discord -> Nullable<Varchar>,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(socials -> users (user_id));
