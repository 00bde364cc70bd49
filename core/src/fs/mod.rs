pub mod svr2_ops;
