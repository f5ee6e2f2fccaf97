// Authoritative store tables (both authorities share one migration set).

diesel::table! {
    accounts (id) {
        id -> Integer,
        email -> Text,
        hashed_password -> Text,
        role -> Text,
        name -> Nullable<Text>,
        gender -> Nullable<Integer>,
        work -> Nullable<Text>,
        date_of_birth -> Nullable<Date>,
        age -> Nullable<Integer>,
        weight -> Double,
        height -> Double,
        upper_pressure -> Nullable<Integer>,
        lower_pressure -> Nullable<Integer>,
        daily_steps -> Nullable<Integer>,
        heart_rate -> Nullable<Integer>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    work_profiles (id) {
        id -> Integer,
        email -> Text,
        work_id -> Nullable<Integer>,
        quality_of_sleep -> Double,
        physical_activity_level -> Double,
        stress_level -> Double,
    }
}

diesel::table! {
    feedback (id) {
        id -> Integer,
        email -> Text,
        body -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    daily_records (id) {
        id -> Integer,
        email -> Text,
        date -> Date,
        upper_pressure -> Nullable<Integer>,
        lower_pressure -> Nullable<Integer>,
        daily_steps -> Nullable<Integer>,
        heart_rate -> Nullable<Integer>,
        duration -> Double,
        prediction_result -> Nullable<Integer>,
    }
}

diesel::table! {
    sleep_sessions (id) {
        id -> Integer,
        email -> Text,
        sleep_date -> Date,
        sleep_time -> Timestamp,
        wake_time -> Timestamp,
        duration -> Double,
    }
}

diesel::table! {
    weekly_predictions (id) {
        id -> Integer,
        email -> Text,
        prediction_result -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    monthly_predictions (id) {
        id -> Integer,
        email -> Text,
        prediction_result -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    propagation_outbox (event_id) {
        event_id -> Text,
        payload -> Text,
        status -> Text,
        retry_count -> Integer,
        next_retry_at -> Nullable<Timestamp>,
        last_error -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    work_profiles,
    feedback,
    daily_records,
    sleep_sessions,
    weekly_predictions,
    monthly_predictions,
    propagation_outbox,
);
