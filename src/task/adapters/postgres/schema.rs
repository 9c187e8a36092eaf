//! Diesel schema for task persistence.

diesel::table! {
    /// Marketplace task records.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Task title.
        title -> Text,
        /// Task description.
        description -> Text,
        /// Robot type (`drone`, `humanoid`, `delivery`, `industrial`).
        robot_type -> Text,
        /// Task location.
        location -> Text,
        /// Optional distance note.
        distance -> Nullable<Text>,
        /// Lifecycle status (`open`, `in_progress`, `completed`).
        status -> Text,
        /// Creator display label.
        created_by -> Text,
        /// Creator wallet address.
        created_by_wallet -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Holder display label.
        taken_by -> Nullable<Text>,
        /// Holder wallet address.
        taken_by_wallet -> Nullable<Text>,
        /// Timestamp the holder took the task.
        taken_at -> Nullable<Timestamptz>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Workflow proof as JSONB.
        workflow -> Nullable<Jsonb>,
        /// Whether the holding timeout released the task.
        timeout_released -> Bool,
        /// Optimistic-concurrency revision.
        revision -> Int8,
    }
}
