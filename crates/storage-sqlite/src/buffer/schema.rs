// Client-side buffer tables. Every row carries `synced` and an edit `version`.

diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        name -> Nullable<Text>,
        gender -> Nullable<Integer>,
        work -> Nullable<Text>,
        date_of_birth -> Nullable<Date>,
        age -> Nullable<Integer>,
        weight -> Nullable<Double>,
        height -> Nullable<Double>,
        upper_pressure -> Nullable<Integer>,
        lower_pressure -> Nullable<Integer>,
        daily_steps -> Nullable<Integer>,
        heart_rate -> Nullable<Integer>,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    work_data (id) {
        id -> Integer,
        email -> Text,
        work_id -> Nullable<Integer>,
        quality_of_sleep -> Nullable<Double>,
        physical_activity_level -> Nullable<Double>,
        stress_level -> Nullable<Double>,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    feedback (id) {
        id -> Integer,
        email -> Text,
        body -> Text,
        created_at -> Timestamp,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    daily (id) {
        id -> Integer,
        email -> Text,
        date -> Date,
        upper_pressure -> Nullable<Integer>,
        lower_pressure -> Nullable<Integer>,
        daily_steps -> Nullable<Integer>,
        heart_rate -> Nullable<Integer>,
        duration -> Nullable<Double>,
        prediction_result -> Nullable<Integer>,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    sleep_records (id) {
        id -> Integer,
        email -> Text,
        sleep_time -> Timestamp,
        wake_time -> Timestamp,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    weekly_predictions (id) {
        id -> Integer,
        email -> Text,
        prediction_result -> Text,
        created_at -> Timestamp,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::table! {
    monthly_predictions (id) {
        id -> Integer,
        email -> Text,
        prediction_result -> Text,
        created_at -> Timestamp,
        synced -> Integer,
        version -> Integer,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    work_data,
    feedback,
    daily,
    sleep_records,
    weekly_predictions,
    monthly_predictions,
);
