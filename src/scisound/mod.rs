pub mod sound0;
