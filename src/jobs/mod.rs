pub mod reminder_scheduler;
