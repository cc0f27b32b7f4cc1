pub mod template_matcher;
