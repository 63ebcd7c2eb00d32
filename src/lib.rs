//! admin-bot - command-dispatch runtime for a chat admin bot

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
