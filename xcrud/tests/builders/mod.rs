mod add_test;
mod find_test;
mod modify_test;
mod remove_test;
mod stage_test;
