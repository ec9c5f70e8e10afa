mod applier_tests;
mod helpers;
mod matcher_tests;
