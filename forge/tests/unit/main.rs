
mod test_chat;
mod test_installer;
mod test_provisioner;
mod test_retry;
mod test_upload;
