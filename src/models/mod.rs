pub mod chat;
pub mod whatsapp;
