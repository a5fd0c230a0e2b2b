mod health_check;
mod helpers;
mod verify_pass;
